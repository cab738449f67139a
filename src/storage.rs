use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::domain::Entry;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse entry on line {line}: {source}")]
    JsonDecode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse entry array: {0}")]
    ArrayDecode(#[source] serde_json::Error),
    #[error("failed to encode entry: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

/// Reads the entry array. Accepts either a JSON array or JSON Lines; a missing
/// file is an empty ledger. Malformed dates are kept and filtered later.
pub fn load_entries(path: &Path) -> Result<Vec<Entry>, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StorageError::Io(err)),
    };

    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        let entries: Vec<Entry> = serde_json::from_str(trimmed).map_err(StorageError::ArrayDecode)?;
        info!(path = %path.display(), count = entries.len(), "loaded entry array");
        return Ok(entries);
    }

    let mut entries = Vec::new();
    for (number, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(line).map_err(|source| StorageError::JsonDecode {
            line: number + 1,
            source,
        })?;
        entries.push(entry);
    }

    info!(path = %path.display(), count = entries.len(), "loaded entries");
    Ok(entries)
}

pub fn save_entries(path: &Path, entries: &[Entry]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = fs::File::create(path)?;
    for entry in entries {
        let line = serde_json::to_string(entry).map_err(StorageError::JsonEncode)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use crate::domain::{Entry, EntryKind};

    use super::{load_entries, save_entries};

    #[test]
    fn round_trips_jsonl() {
        let entries = vec![
            Entry::new("a", "2024-01-05", 50.0, EntryKind::Outflow).with_category("food"),
            Entry::new("b", "2024-01-06T09:30:00", 1200.0, EntryKind::Inflow).with_method("transfer"),
        ];

        let path = temp_file("ledger_lens_roundtrip.jsonl");
        save_entries(&path, &entries).expect("save should succeed");
        let loaded = load_entries(&path).expect("load should succeed");
        assert_eq!(loaded, entries);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn keeps_entries_with_bad_dates_in_place() {
        let path = temp_file("ledger_lens_bad_dates.json");
        fs::write(
            &path,
            r#"[{"id":"a","date":"2024-01-05","amount":3},{"id":"b","date":null},{"id":"c","date":"soon","amount":1}]"#,
        )
        .expect("write");

        let loaded = load_entries(&path).expect("load should succeed");
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[1].date, None);
        assert_eq!(loaded[1].amount, None);
        assert_eq!(loaded[2].day(), None);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn odd_field_values_do_not_reject_the_file() {
        let path = temp_file("ledger_lens_odd_fields.jsonl");
        fs::write(
            &path,
            concat!(
                "{\"id\":\"a\",\"date\":\"2024-01-05\",\"amount\":\"12.50\",\"kind\":\"expense\"}\n",
                "{\"date\":\"2024-01-06\",\"amount\":\"lots\",\"kind\":\"income\"}\n",
                "{\"id\":7,\"date\":\"2024-01-07\",\"amount\":3,\"kind\":\"refund\"}\n",
            ),
        )
        .expect("write");

        let loaded = load_entries(&path).expect("load should succeed");
        assert_eq!(loaded.len(), 3);

        assert_eq!(loaded[0].amount, Some(12.5));
        assert_eq!(loaded[0].kind, EntryKind::Outflow);

        assert_eq!(loaded[1].id, "");
        assert_eq!(loaded[1].amount, None);
        assert_eq!(loaded[1].kind, EntryKind::Inflow);

        assert_eq!(loaded[2].id, "7");
        assert_eq!(loaded[2].amount, Some(3.0));
        assert_eq!(loaded[2].kind, EntryKind::Outflow);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_empty_and_broken_lines_report_position() {
        assert!(load_entries(&temp_file("ledger_lens_absent.jsonl")).expect("load").is_empty());

        let path = temp_file("ledger_lens_broken.jsonl");
        fs::write(&path, "{\"id\":\"a\"}\n\n{oops\n").expect("write");
        let err = load_entries(&path).expect_err("should fail");
        assert!(err.to_string().contains("line 3"));
        let _ = fs::remove_file(path);
    }

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }
}

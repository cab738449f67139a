use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::buckets::{Granularity, SegmentAxis};
use crate::domain::SortOrder;

pub const VIEW_STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode view state store: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("failed to encode view preferences: {0}")]
    JsonEncode(#[from] serde_json::Error),
}

/// Minimal keyed storage for view preferences.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// TOML table of string values, rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store. An unreadable or corrupt file starts empty instead of failing.
    pub fn open(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(raw) => toml::from_str::<BTreeMap<String, String>>(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "discarding corrupt view state store");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read view state store");
                BTreeMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            values,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, toml::to_string_pretty(&self.values)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewTab {
    #[default]
    Ledger,
    Chart,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodOffsets {
    pub week: i32,
    pub month: i32,
    pub year: i32,
}

impl PeriodOffsets {
    pub fn get(&self, granularity: Granularity) -> i32 {
        match granularity {
            Granularity::Week => self.week,
            Granularity::Month => self.month,
            Granularity::Year => self.year,
        }
    }

    pub fn get_mut(&mut self, granularity: Granularity) -> &mut i32 {
        match granularity {
            Granularity::Week => &mut self.week,
            Granularity::Month => &mut self.month,
            Granularity::Year => &mut self.year,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPreferences {
    pub schema_version: u32,
    pub granularity: Granularity,
    pub offsets: PeriodOffsets,
    pub tab: ViewTab,
    pub sort_order: SortOrder,
    pub axis: SegmentAxis,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            schema_version: VIEW_STATE_SCHEMA_VERSION,
            granularity: Granularity::Month,
            offsets: PeriodOffsets::default(),
            tab: ViewTab::Ledger,
            sort_order: SortOrder::Descending,
            axis: SegmentAxis::Category,
        }
    }
}

/// Composite key scoping preferences to an owner and a screen.
pub fn view_key(owner: &str, context: &str) -> String {
    format!("{owner}:{context}:view")
}

/// Reads preferences, falling back to defaults on a missing, corrupt or
/// foreign-schema value.
pub fn load_preferences(store: &dyn KeyValueStore, key: &str) -> ViewPreferences {
    let Some(raw) = store.get(key) else {
        return ViewPreferences::default();
    };

    match serde_json::from_str::<ViewPreferences>(&raw) {
        Ok(preferences) if preferences.schema_version == VIEW_STATE_SCHEMA_VERSION => preferences,
        Ok(preferences) => {
            warn!(
                key,
                found = preferences.schema_version,
                expected = VIEW_STATE_SCHEMA_VERSION,
                "view preferences schema mismatch, using defaults"
            );
            ViewPreferences::default()
        }
        Err(err) => {
            warn!(key, %err, "unreadable view preferences, using defaults");
            ViewPreferences::default()
        }
    }
}

pub fn save_preferences(
    store: &mut dyn KeyValueStore,
    key: &str,
    preferences: &ViewPreferences,
) -> Result<(), StoreError> {
    store.set(key, serde_json::to_string(preferences)?)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use crate::buckets::Granularity;
    use crate::domain::SortOrder;

    use super::{
        FileStore, KeyValueStore, MemoryStore, ViewPreferences, ViewTab, load_preferences, save_preferences, view_key,
    };

    #[test]
    fn preferences_are_scoped_by_owner_and_context() {
        let mut store = MemoryStore::default();
        let mut preferences = ViewPreferences::default();
        preferences.granularity = Granularity::Week;
        *preferences.offsets.get_mut(Granularity::Week) = -3;
        preferences.tab = ViewTab::Chart;
        preferences.sort_order = SortOrder::Ascending;

        save_preferences(&mut store, &view_key("alice", "ledger"), &preferences).expect("save");
        assert_eq!(load_preferences(&store, &view_key("alice", "ledger")), preferences);
        assert_eq!(load_preferences(&store, &view_key("bob", "ledger")), ViewPreferences::default());
    }

    #[test]
    fn corrupt_or_foreign_values_fall_back_to_defaults() {
        let mut store = MemoryStore::default();
        store.set("k", "{not json".to_string()).expect("set");
        assert_eq!(load_preferences(&store, "k"), ViewPreferences::default());

        let mut future = serde_json::to_value(ViewPreferences::default()).expect("encode");
        future["schema_version"] = serde_json::json!(99);
        future["granularity"] = serde_json::json!("year");
        store.set("k", future.to_string()).expect("set");
        assert_eq!(load_preferences(&store, "k"), ViewPreferences::default());
    }

    #[test]
    fn file_store_survives_reopen_and_corruption() {
        let path = temp_file("ledger_lens_view_state.toml");
        let mut store = FileStore::open(&path);
        store.set("local:ledger:view", "{\"a\":1}".to_string()).expect("set");

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("local:ledger:view").as_deref(), Some("{\"a\":1}"));

        fs::write(&path, "= broken").expect("write");
        let corrupt = FileStore::open(&path);
        assert_eq!(corrupt.get("local:ledger:view"), None);
        let _ = fs::remove_file(path);
    }

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }
}

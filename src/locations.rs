use std::env;
use std::fs;
use std::path::PathBuf;

const ENTRIES_FILE: &str = "entries.jsonl";
const CONFIG_FILE: &str = "config.toml";
const VIEW_STATE_FILE: &str = "view_state.toml";
const LOG_FILE: &str = "ledger_lens.log";

pub fn resolve_entries_path(cli_path: Option<PathBuf>) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = non_empty_env("LEDGER_LENS_ENTRIES") {
		return absolutize(path);
	}

	state_dir().join(ENTRIES_FILE)
}

pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = non_empty_env("LEDGER_LENS_CONFIG") {
		return absolutize(path);
	}

	state_dir().join(CONFIG_FILE)
}

pub fn view_state_path() -> PathBuf {
	state_dir().join(VIEW_STATE_FILE)
}

pub fn log_path() -> PathBuf {
	state_dir().join(LOG_FILE)
}

pub fn state_dir() -> PathBuf {
	if let Some(path) = env::var_os("LEDGER_LENS_STATE_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join("ledger_lens");
		}
	}

	if let Some(path) = env::var_os("XDG_STATE_HOME") {
		return PathBuf::from(path).join("ledger_lens");
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path)
			.join(".local")
			.join("state")
			.join("ledger_lens");
	}

	PathBuf::from(".ledger_lens")
}

fn non_empty_env(name: &str) -> Option<PathBuf> {
	env::var_os(name)
		.map(PathBuf::from)
		.filter(|path| !path.as_os_str().is_empty())
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::{resolve_config_path, resolve_entries_path};

	#[test]
	fn explicit_paths_win_and_become_absolute() {
		let entries = resolve_entries_path(Some(PathBuf::from("some/entries.jsonl")));
		assert!(entries.is_absolute());
		assert!(entries.ends_with("some/entries.jsonl"));

		let config = resolve_config_path(Some(PathBuf::from("/tmp/lens.toml")));
		assert_eq!(config, PathBuf::from("/tmp/lens.toml"));
	}
}

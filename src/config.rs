use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calendar::DateFormat;
use crate::domain::SortOrder;
use crate::selection::DEFAULT_SUPPRESS_MS;
use crate::viewport::{
    DEFAULT_ACTIVATION_LOOKAHEAD, DEFAULT_ACTIVATION_TRAILING, DEFAULT_AFFORDANCE_THRESHOLD,
    DEFAULT_BOTTOM_FALLBACK_DISTANCE, ViewportSettings,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to encode config: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub date_format: String,
    pub sort_order: SortOrder,
    pub activation_lookahead: f64,
    pub activation_trailing: f64,
    pub bottom_fallback_distance: f64,
    pub scroll_affordance_threshold: f64,
    pub selection_suppress_ms: u64,
    pub owner: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            date_format: "%d %b %Y".to_string(),
            sort_order: SortOrder::Descending,
            activation_lookahead: DEFAULT_ACTIVATION_LOOKAHEAD,
            activation_trailing: DEFAULT_ACTIVATION_TRAILING,
            bottom_fallback_distance: DEFAULT_BOTTOM_FALLBACK_DISTANCE,
            scroll_affordance_threshold: DEFAULT_AFFORDANCE_THRESHOLD,
            selection_suppress_ms: DEFAULT_SUPPRESS_MS,
            owner: "local".to_string(),
        }
    }
}

impl Config {
    pub fn date_format(&self) -> DateFormat {
        DateFormat::new(&self.date_format)
    }

    pub fn viewport_settings(&self) -> ViewportSettings {
        ViewportSettings {
            activation_lookahead: self.activation_lookahead,
            activation_trailing: self.activation_trailing,
            bottom_fallback_distance: self.bottom_fallback_distance,
            affordance_threshold: self.scroll_affordance_threshold,
        }
    }
}

/// A missing file yields defaults; a malformed one is an error.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Err(err) => return Err(ConfigError::Io(err)),
    };

    Ok(toml::from_str(&raw)?)
}

pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, toml::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use crate::domain::SortOrder;

    use super::{Config, load_config, save_config};

    #[test]
    fn partial_files_keep_defaults_for_missing_keys() {
        let path = temp_file("ledger_lens_partial.toml");
        fs::write(&path, "sort_order = \"ascending\"\nactivation_lookahead = 60.0\n").expect("write");
        let config = load_config(&path).expect("load");
        assert_eq!(config.sort_order, SortOrder::Ascending);
        assert_eq!(config.activation_lookahead, 60.0);
        assert_eq!(config.activation_trailing, 50.0);
        assert_eq!(config.selection_suppress_ms, 250);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_default_and_garbage_is_an_error() {
        let missing = temp_file("ledger_lens_missing.toml");
        assert_eq!(load_config(&missing).expect("load"), Config::default());

        let path = temp_file("ledger_lens_garbage.toml");
        fs::write(&path, "sort_order = [").expect("write");
        assert!(load_config(&path).is_err());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn saved_config_round_trips() {
        let path = temp_file("ledger_lens_saved.toml");
        let mut config = Config::default();
        config.owner = "household".to_string();
        save_config(&path, &config).expect("save");
        assert_eq!(load_config(&path).expect("load"), config);
        let _ = fs::remove_file(path);
    }

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }
}

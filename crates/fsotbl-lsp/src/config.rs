//! User configuration for the table language server.
//!
//! Configuration is stored at `~/.config/fsotbl/config.json`. Every field is
//! optional; missing fields keep their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fsotbl_tables::TableKind;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// User configuration for the language server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Deadline of one document analysis, in milliseconds.
    pub analysis_timeout_ms: u64,
    /// Table used when a document's file name does not identify one.
    pub default_table: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            analysis_timeout_ms: 1000,
            default_table: TableKind::Armor.name().to_string(),
        }
    }
}

impl UserConfig {
    /// Parse a configuration file's content.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }

    /// The table for a document at `path`: picked by file name, falling back
    /// to [`default_table`](Self::default_table), then to armor.
    pub fn table_for(&self, path: &str) -> TableKind {
        if let Some(kind) = TableKind::from_path(path) {
            return kind;
        }
        TableKind::from_name(&self.default_table).unwrap_or_else(|| {
            warn!(table = %self.default_table, "Unknown default table, using armor");
            TableKind::Armor
        })
    }
}

/// Get the path to the user config file.
///
/// Returns `~/.config/fsotbl/config.json` on Unix, or the equivalent
/// platform-specific config directory on other platforms.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fsotbl").join("config.json"))
}

/// Load the user configuration from disk.
///
/// Returns `Ok(None)` if the config file doesn't exist yet.
/// Returns `Err` if the file exists but couldn't be read or parsed.
pub fn load_config() -> Result<Option<UserConfig>, LoadConfigError> {
    let Some(path) = config_path() else {
        debug!("No config directory available");
        return Ok(None);
    };
    load_config_from(&path)
}

pub(crate) fn load_config_from(path: &Path) -> Result<Option<UserConfig>, LoadConfigError> {
    if !path.exists() {
        debug!(?path, "Config file does not exist yet");
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| LoadConfigError::Io {
        path: path.to_path_buf(),
        error: e,
    })?;

    let config = UserConfig::from_json(&content).map_err(|e| LoadConfigError::Parse {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    info!(?path, timeout_ms = config.analysis_timeout_ms, table = %config.default_table, "Loaded user config");
    Ok(Some(config))
}

/// Error loading the user config.
#[derive(Debug)]
pub enum LoadConfigError {
    Io { path: PathBuf, error: std::io::Error },
    Parse { path: PathBuf, error: String },
}

impl std::fmt::Display for LoadConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadConfigError::Io { path, error } => {
                write!(f, "Failed to read config at {}: {}", path.display(), error)
            }
            LoadConfigError::Parse { path, error } => {
                write!(f, "Failed to parse config at {}: {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for LoadConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = UserConfig::from_json(r#"{ "analysis_timeout_ms": 250 }"#).unwrap();
        assert_eq!(config.analysis_timeout(), Duration::from_millis(250));
        assert_eq!(config.default_table, "armor");
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        assert!(UserConfig::from_json(r#"{ "analysis_timeout_ms": "soon" }"#).is_err());
    }

    #[test]
    fn test_table_for_prefers_file_name() {
        let config = UserConfig {
            default_table: "nonsense".to_string(),
            ..UserConfig::default()
        };
        assert_eq!(config.table_for("/data/tables/mod-amr.tbm"), TableKind::Armor);
        assert_eq!(config.table_for("/untitled"), TableKind::Armor);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("fsotbl-config-test-missing.json");
        assert!(load_config_from(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_broken_file() {
        let path = std::env::temp_dir().join(format!("fsotbl-config-test-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let result = load_config_from(&path);
        std::fs::remove_file(&path).unwrap();
        let error = result.unwrap_err();
        assert!(matches!(error, LoadConfigError::Parse { .. }));
        assert!(error.to_string().starts_with("Failed to parse config at "));
    }
}

//! Application configuration loaded from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Where closing prices come from when not running offline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Yahoo Finance, with fetched histories also written to the CSV store.
    #[default]
    Yahoo,
    /// The local CSV store only.
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Owner name stamped on every ledger.
    pub owner: String,

    /// Directory of `<TICKER>.csv` close histories.
    pub data_dir: PathBuf,

    /// Directory of ledger snapshot files.
    pub portfolio_dir: PathBuf,

    /// TOML ticker universe; the built-in US list when unset.
    pub universe_file: Option<PathBuf>,

    pub provider: ProviderKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            owner: "default".to_string(),
            data_dir: PathBuf::from("data/prices"),
            portfolio_dir: PathBuf::from("data/portfolios"),
            universe_file: None,
            provider: ProviderKind::default(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(AppConfig::from_toml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let cfg = AppConfig::from_toml(
            r#"
owner = "alice"
provider = "csv"
universe_file = "universe.toml"
"#,
        )
        .unwrap();
        assert_eq!(cfg.owner, "alice");
        assert_eq!(cfg.provider, ProviderKind::Csv);
        assert_eq!(cfg.universe_file, Some(PathBuf::from("universe.toml")));
        assert_eq!(cfg.data_dir, PathBuf::from("data/prices"));
    }

    #[test]
    fn unknown_provider_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holdlab.toml");
        std::fs::write(&path, "provider = \"bloomberg\"\n").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }
}

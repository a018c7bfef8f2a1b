use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::paths::DEFAULT_STORAGE_ROOT;

/// Tool settings loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageSettings {
    /// BlueZ storage root holding `<HOST>/<TARGET>/info`.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// Errors returned when loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_settings(&raw, path.display().to_string())
}

/// Built-in settings.
pub fn default_settings() -> Settings {
    let embedded = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/settings/default.toml"));
    parse_settings(embedded, "embedded settings".to_string()).unwrap_or_default()
}

fn parse_settings(raw: &str, path: String) -> Result<Settings, SettingsError> {
    toml::from_str(raw).map_err(|source| SettingsError::Parse { path, source })
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_ROOT)
}

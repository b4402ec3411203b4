//! Core configuration.
//!
//! # Responsibility
//! - Define host-tunable settings (storage namespace or legacy key layout,
//!   save quiet period, default theme, log level) with serde defaults.
//! - Load and save them as JSON.
//!
//! # Invariants
//! - Missing fields take their defaults; unknown fields are ignored.
//! - `load_or_default` never fails.

use crate::logging::{default_log_level, normalize_level};
use crate::model::preferences::Theme;
use crate::repo::kv_store::{StorageKeys, DEFAULT_NAMESPACE};
use crate::service::persistence::DEFAULT_QUIET_PERIOD_MS;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "config file `{}`: {source}", path.display()),
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::InvalidLogLevel(level) => write!(f, "invalid log level `{level}`"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidLogLevel(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    /// Prefix of every storage key.
    pub namespace: String,
    /// Read and write the browser app's bare `pages`/`theme` keys; the
    /// namespace is ignored.
    pub legacy_keys: bool,
    /// Debounce window for content saves.
    pub save_quiet_period_ms: u64,
    /// Theme used until the user picks one.
    pub default_theme: Theme,
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            legacy_keys: false,
            save_quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            default_theme: Theme::default(),
            log_level: default_log_level().to_string(),
        }
    }
}

impl CoreConfig {
    /// Parses JSON; blank input yields the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_json::from_str(json)?;
        config.log_level = normalize_level(&config.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(config.log_level.clone()))?
            .to_string();
        if config.namespace.trim().is_empty() {
            config.namespace = DEFAULT_NAMESPACE.to_string();
        }
        Ok(config)
    }

    /// Key layout selected by `legacy_keys` and `namespace`.
    pub fn storage_keys(&self) -> StorageKeys {
        if self.legacy_keys {
            StorageKeys::legacy()
        } else {
            StorageKeys::new(&self.namespace)
        }
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "event=config_load module=config status=ok source=defaults reason=missing_file"
            );
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        info!("event=config_load module=config status=ok source=file");
        Ok(config)
    }

    /// Like `load`, but logs and falls back to defaults on any error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    "event=config_load module=config status=degraded source=defaults error={}",
                    err
                );
                Self::default()
            }
        }
    }

    /// Writes pretty JSON through a sibling temp file, then renames it over
    /// `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(io_error)?;
        fs::rename(&temp_path, path).map_err(io_error)?;
        Ok(())
    }
}

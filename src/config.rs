//! Run configuration: what the session does around each statement.
//!
//! Loaded from an optional TOML file; command-line flags are OR-ed in on top.

use std::{
    io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "SQL_EXPAND_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--safe and --unsafe cannot both be set")]
    SafetyConflict,
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// How `UPDATE`/`DELETE` statements without a key are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SafetyMode {
    /// Safe updates on; a rejected statement is retried with them off, with a
    ///  warning.
    #[default]
    Warn,
    /// Safe updates on; a rejected statement fails.
    Safe,
    /// Safe updates never enabled.
    Unsafe,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Run statements as given, without `$` expansion.
    pub no_expand: bool,
    /// Log at debug level, including each statement as it runs.
    pub debug: bool,
    pub safe: bool,
    #[serde(rename = "unsafe")]
    pub unsafe_updates: bool,
    /// Wrap the run in `START TRANSACTION` / `COMMIT`.
    pub transaction: bool,
    /// Fail on a deadlock instead of retrying once.
    pub abort_deadlock: bool,
    /// Print the insert id after each change.
    pub report_id: bool,
    /// Print the affected row count after each change.
    pub report_changes: bool,
    /// A change that touched no rows counts as a failure.
    pub status_changes: bool,
    /// Pause briefly after each statement.
    pub slow: bool,
}

impl Config {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Loads [path], else the file named by `$SQL_EXPAND_CONFIG`, else the
    ///  defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn safety(&self) -> Result<SafetyMode, ConfigError> {
        match (self.safe, self.unsafe_updates) {
            (true, true) => Err(ConfigError::SafetyConflict),
            (true, false) => Ok(SafetyMode::Safe),
            (false, true) => Ok(SafetyMode::Unsafe),
            (false, false) => Ok(SafetyMode::Warn),
        }
    }
}

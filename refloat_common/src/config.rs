//! TOML loading shared by the runner, tests and benches.
//!
//! Any `Deserialize` type gets [`ConfigLoader::load`] for free. The
//! `[shared]` section every runner file carries is [`SharedConfig`]; ride
//! tuning is [`crate::ride::config::RefloatConfig`].
//!
//! ```rust,no_run
//! use refloat_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct HostConfig {
//!     shared: SharedConfig,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let host = HostConfig::load(Path::new("refloat.toml"))?;
//!     host.shared.validate()?;
//!     Ok(())
//! }
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read config: {0}")]
    Read(String),

    #[error("malformed TOML: {0}")]
    Parse(String),

    #[error("rejected: {0}")]
    Invalid(String),
}

/// Runner log verbosity, spelled lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// `[shared]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedConfig {
    pub log_level: LogLevel,
    /// Shown in the startup log line.
    pub board_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            board_name: "refloat".into(),
        }
    }
}

impl SharedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_name.trim().is_empty() {
            return Err(ConfigError::Invalid("board_name is blank".into()));
        }
        Ok(())
    }
}

/// TOML deserialization for every `DeserializeOwned` type.
pub trait ConfigLoader: DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::load_str(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ConfigError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(ConfigError::Read(e.to_string())),
        }
    }

    fn load_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl<T: DeserializeOwned> ConfigLoader for T {}

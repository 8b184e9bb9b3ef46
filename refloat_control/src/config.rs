//! TOML configuration loader for the host runner.
//!
//! One file holds a `[shared]` section ([`SharedConfig`]) and a `[ride]`
//! section ([`RefloatConfig`]). Both are validated before use.
//!
//! ```toml
//! [shared]
//! board_name = "xr-rally-01"
//!
//! [ride]
//! hertz = 800
//!
//! [ride.pid]
//! kp = 20.0
//! ```

use std::path::Path;

use refloat_common::config::{ConfigError as LoadError, ConfigLoader, SharedConfig};
use refloat_common::ride::config::RefloatConfig;
use serde::Deserialize;
use thiserror::Error;

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File missing or unparsable.
    #[error("{path}: {source}")]
    Load {
        path: String,
        #[source]
        source: LoadError,
    },
    /// Shared section rejected.
    #[error("shared config: {0}")]
    Shared(LoadError),
    /// Ride section rejected.
    #[error("ride config: {0}")]
    Ride(String),
}

// ─── Loaded Config Bundle ───────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    shared: SharedConfig,
    #[serde(default)]
    ride: RefloatConfig,
}

/// Validated configuration, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub shared: SharedConfig,
    pub ride: RefloatConfig,
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the runner configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let raw = RawConfig::load(path).map_err(|source| ConfigError::Load {
        path: path.display().to_string(),
        source,
    })?;
    validate(raw)
}

/// Parse and validate an in-memory TOML document.
pub fn load_config_from_str(content: &str) -> Result<LoadedConfig, ConfigError> {
    let raw = RawConfig::load_str(content).map_err(|source| ConfigError::Load {
        path: "<string>".to_string(),
        source,
    })?;
    validate(raw)
}

fn validate(raw: RawConfig) -> Result<LoadedConfig, ConfigError> {
    raw.shared.validate().map_err(ConfigError::Shared)?;
    raw.ride.validate().map_err(ConfigError::Ride)?;
    Ok(LoadedConfig {
        shared: raw.shared,
        ride: raw.ride,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────

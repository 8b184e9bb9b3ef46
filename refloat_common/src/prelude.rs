//! Prelude module for common re-exports.
//!
//! ```rust
//! use refloat_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::ride::config::{ParkingBrakeMode, RefloatConfig};

// ─── Ride State ─────────────────────────────────────────────────────
pub use crate::ride::error::{AlertId, AlertMask, AlertType, BmsFault};
pub use crate::ride::state::{
    CompatSat, CompatStatus, FootpadSensorState, Mode, RunState, SetpointAdjustmentType,
    StopCondition,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_LOOP_HERTZ, SYSTEM_TICK_RATE_HZ};

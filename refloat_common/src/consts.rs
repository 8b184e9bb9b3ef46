//! Package-wide constants for the Refloat workspace.
//!
//! Single source of truth for tick rates, wire magic numbers and timeouts.
//! Imported by all crates; do not duplicate them elsewhere.

/// Host system tick rate [Hz] (one tick = 100 µs).
pub const SYSTEM_TICK_RATE_HZ: u32 = 10_000;

/// Default control loop frequency [Hz].
pub const DEFAULT_LOOP_HERTZ: u16 = 800;

/// Number of records kept in the alert history ring.
pub const ALERT_TRACKER_SIZE: usize = 20;

/// Package id prefixed to every outbound app-data packet.
pub const PACKAGE_ID: u8 = 101;

/// First byte of a charging state command.
pub const CHARGING_MAGIC: u8 = 151;

/// Minimum length of a charging state command [bytes].
pub const CHARGING_PAYLOAD_LEN: usize = 6;

/// Charging flag is dropped after this long without a refresh [s].
pub const CHARGING_TIMEOUT_S: f32 = 5.0;

/// BMS data older than this raises a connection fault [s].
pub const BMS_MSG_TIMEOUT_S: f32 = 5.0;

/// Grace period after boot before BMS connection faults are reported [s].
pub const BMS_STARTUP_GRACE_S: f32 = 5.0;

/// Initial BMS message age before the first sample arrives [s].
pub const BMS_MSG_AGE_INITIAL_S: f32 = 42.0;

/// Wheel is considered moving above this |ERPM|.
pub const ERPM_MOVING_THRESHOLD: f32 = 10.0;

/// Maximum outbound app-data packet size [bytes].
pub const SEND_BUF_MAX_SIZE: usize = 511;

/// Disengage timer is initialized this far in the past [s].
pub const DISENGAGE_TIMER_INITIAL_AGE_S: u32 = 60;

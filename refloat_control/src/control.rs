//! Control engine root.
//!
//! Balance control while running: setpoint selection with its tilt
//! contributors, the balance PID with booster, and surge. Motor telemetry
//! filtering, the single per-tick motor command, and haptic feedback also
//! live here.

pub mod atr;
pub mod biquad;
pub mod booster;
pub mod brake_tilt;
pub mod filters;
pub mod haptic;
pub mod motor;
pub mod motor_data;
pub mod pid;
pub mod remote;
pub mod setpoint;
pub mod surge;
pub mod torque_tilt;
pub mod turn_tilt;

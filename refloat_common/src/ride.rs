//! Ride-control shared types.
//!
//! - [`state`] - run state, mode, saturation, stop condition, status codes
//! - [`error`] - alert ids and alert/BMS fault bitflags
//! - [`config`] - ride tuning configuration with bounds validation

pub mod config;
pub mod error;
pub mod state;

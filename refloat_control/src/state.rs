//! Ride state root.
//!
//! Primary state and its legacy status codes, footpad classification,
//! footpad gestures and the charging report.

pub mod charging;
pub mod footpad;
pub mod konami;
pub mod ride;

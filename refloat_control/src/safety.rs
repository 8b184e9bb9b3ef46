//! Safety module root.
//!
//! Alert tracking with the fatal latch, and BMS fault evaluation.

pub mod alert_tracker;
pub mod bms;

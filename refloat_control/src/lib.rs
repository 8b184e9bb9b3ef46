//! # Refloat Control Library
//!
//! Ride-control core of a self-balancing one-wheel board. Runs as a periodic
//! task next to the motor controller firmware: every tick it reads motor,
//! IMU, footpad and BMS values from the host, runs the ride state machine
//! and issues exactly one motor command.
//!
//! ## Layers
//!
//! 1. **Host** ([`host`]): traits the firmware implements, plus a simulator
//! 2. **Components** ([`control`], [`safety`], [`state`], [`record`]):
//!    per-tick building blocks with no knowledge of each other
//! 3. **Controller** ([`controller`]): owns every component and sequences one tick
//! 4. **Runner** ([`cycle`]): periodic loop with timing statistics
//!
//! ## Allocation
//!
//! Components are sized at construction. The tick path does not allocate;
//! packets and queues use `heapless` storage.

pub mod buffer;
pub mod circular_buffer;
pub mod config;
pub mod control;
pub mod controller;
pub mod cycle;
pub mod host;
pub mod record;
pub mod safety;
pub mod state;
pub mod time;

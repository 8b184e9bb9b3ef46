//! Refloat Common Library
//!
//! Shared constants, ride-state types, alert/fault bitflags and configuration
//! loading utilities for the Refloat ride-control workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Package-wide numeric constants
//! - [`config`] - Configuration loading traits and types
//! - [`ride`] - Ride state enums, alert/fault flags and ride configuration
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use refloat_common::prelude::*;
//!
//! let state = RunState::default();
//! assert_eq!(state, RunState::Startup);
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod ride;

//! Pellet gauge library.
//!
//! Estimates the fuel left in a pellet stove hopper from indirect signals
//! (operating status, power level) and learns per-level correction factors
//! whenever the true level becomes known.  Everything platform-specific
//! sits behind the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod estimator;
pub mod persistence;
pub mod scheduler;

pub use app::service::{Lifecycle, TrackerService};
pub use config::TrackerConfig;
pub use error::{Error, Result};

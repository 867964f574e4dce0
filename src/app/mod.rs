//! Application core: tracker orchestration, zero platform I/O.
//!
//! The estimator rules live in [`crate::estimator`]; this layer wires them
//! to the outside world through **port traits** defined in [`ports`],
//! keeping everything testable with in-memory adapters.

pub mod commands;
pub mod events;
pub mod listeners;
pub mod ports;
pub mod service;

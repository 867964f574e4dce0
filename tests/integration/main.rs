//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the tracker through its
//! public API against mock adapters.

mod mock_ports;
mod persistence_tests;
mod service_tests;

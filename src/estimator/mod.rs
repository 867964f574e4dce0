//! Estimation core: pure logic, zero I/O.
//!
//! ```text
//!   RateTable ─┐
//!              ├──▶ TrackerState::integrate ──▶ level, session counters
//!   CorrectionTable ◀── TrackerState::calibrate ◀── refill / set_level
//! ```
//!
//! Nothing in here logs to anything but the `log` facade, reads a clock,
//! or touches storage.  The [`app`](crate::app) layer wraps it with
//! persistence, notification and lifecycle.

pub mod calibration;
pub mod correction;
pub mod integrator;
pub mod level;
pub mod rates;
pub mod state;
pub mod timestamp;

pub use calibration::{CalibrationReport, CalibrationSkip, FactorUpdate, LevelSetOutcome, RefillOutcome};
pub use correction::CorrectionTable;
pub use integrator::{IntegrationOutcome, Observation};
pub use level::PowerLevel;
pub use rates::{RateEntry, RateTable};
pub use state::TrackerState;
pub use timestamp::Timestamp;

//! Inbound commands to the tracker service.
//!
//! These represent actions requested by the outside world (a refill
//! button, a "set level" service call, the scheduler) that the
//! [`TrackerService`](super::service::TrackerService) interprets and acts upon.

/// Commands that external adapters can send into the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerCommand {
    /// Run an integration step now (scheduler tick or observation change).
    Update,

    /// The tank was filled to capacity.
    Refill,

    /// Manually correct the level, optionally treating it as ground truth
    /// for calibration.
    SetLevel { grams: f64, calibrate: bool },
}

impl TrackerCommand {
    /// Convenience constructor taking kilograms, the unit users read off a scale.
    pub fn set_level_kg(kilograms: f64, calibrate: bool) -> Self {
        Self::SetLevel {
            grams: kilograms * 1000.0,
            calibrate,
        }
    }
}

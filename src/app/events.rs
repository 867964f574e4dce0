//! Outbound tracker events.
//!
//! The [`TrackerService`](super::service::TrackerService) emits these to
//! every registered [`EventSink`](super::ports::EventSink).  Listeners on
//! the other side decide what to do with them (refresh a level entity,
//! log, publish over a message bus).

use serde::Serialize;

use crate::estimator::{CalibrationReport, TrackerState};

/// Structured events emitted by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// The tracker finished initialising (carries the restored state).
    Started(TrackerSnapshot),

    /// Level or session counters changed.
    StateChanged(TrackerSnapshot),

    /// Correction factors were updated from a refill or manual level.
    Calibrated(CalibrationReport),

    /// The tank was refilled.
    Refilled { previous_level_g: f64 },

    /// The level was corrected by hand.
    LevelSet { previous_level_g: f64, new_level_g: f64 },

    /// The tracker was closed; no further events follow.
    Closed,
}

/// A point-in-time view of the tracker suitable for display or transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    /// Remaining fuel, whole percent (0–100).
    pub level_percent: u8,
    /// Remaining fuel in kg, rounded to 10 g.
    pub remaining_kg: f64,
    /// Estimated consumption since the last refill / manual set, kg.
    pub session_consumed_kg: f64,
    /// Base rates derived from configuration, `(level, g/h)`.
    pub base_rates: Vec<(String, f64)>,
    /// Base rates with learned corrections applied, `(level, g/h)`.
    pub effective_rates: Vec<(String, f64)>,
    /// Learned correction factors, `(level, factor)`.
    pub correction_factors: Vec<(String, f64)>,
}

impl TrackerSnapshot {
    pub fn capture(state: &TrackerState) -> Self {
        let level_percent = (state.fill_fraction() * 100.0) as u8;
        Self {
            level_percent: level_percent.min(100),
            remaining_kg: round_centi(state.current_level_g() / 1000.0),
            session_consumed_kg: round_centi(state.session_consumed_g() / 1000.0),
            base_rates: state
                .rates()
                .iter()
                .map(|e| (e.level.to_string(), e.grams_per_hour))
                .collect(),
            effective_rates: state
                .rates()
                .effective_rates(state.corrections())
                .into_iter()
                .map(|e| (e.level.to_string(), e.grams_per_hour))
                .collect(),
            correction_factors: state
                .corrections()
                .iter()
                .map(|(level, factor)| (level.to_string(), factor))
                .collect(),
        }
    }
}

fn round_centi(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing tracker events through the `log`
//! facade, one line per event.  Whatever logger the host installs decides
//! where they end up.

use log::{debug, info};

use crate::app::events::TrackerEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`TrackerEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink {
    /// Prefix identifying the tracker in multi-tracker hosts.
    label: String,
}

impl LogEventSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &TrackerEvent) {
        let label = &self.label;
        match event {
            TrackerEvent::Started(s) => {
                info!(
                    "START | {} | level={}% remaining={:.2}kg session={:.2}kg",
                    label, s.level_percent, s.remaining_kg, s.session_consumed_kg
                );
            }
            TrackerEvent::StateChanged(s) => {
                debug!(
                    "LEVEL | {} | level={}% remaining={:.2}kg session={:.2}kg",
                    label, s.level_percent, s.remaining_kg, s.session_consumed_kg
                );
            }
            TrackerEvent::Calibrated(r) => {
                info!(
                    "CALIB | {} | estimated={:.0}g actual={:.0}g ratio={:.3} (raw {:.3}) levels={}",
                    label,
                    r.estimated_g,
                    r.actual_g,
                    r.error_ratio,
                    r.raw_ratio,
                    r.updates.len()
                );
                for u in &r.updates {
                    debug!(
                        "CALIB | {} | level {} factor {:.4} -> {:.4} (weight {:.2})",
                        label, u.level, u.old_factor, u.new_factor, u.weight
                    );
                }
            }
            TrackerEvent::Refilled { previous_level_g } => {
                info!("REFILL | {} | was {:.0}g", label, previous_level_g);
            }
            TrackerEvent::LevelSet {
                previous_level_g,
                new_level_g,
            } => {
                info!(
                    "SET | {} | {:.0}g -> {:.0}g",
                    label, previous_level_g, new_level_g
                );
            }
            TrackerEvent::Closed => {
                info!("CLOSE | {}", label);
            }
        }
    }
}

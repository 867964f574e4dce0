//! Latest-value observation adapter.
//!
//! Hosts that receive signal updates as `(signal id, value)` pairs (a
//! state-change bus, a recorded trace) feed them into
//! [`ReplayObservations`]; the tracker then pulls the most recent status and
//! power level through [`ObservationPort`].

use log::trace;

use crate::app::ports::ObservationPort;
use crate::config::TrackerConfig;

/// Holds the last reported value of the two proxy signals.
#[derive(Debug, Clone)]
pub struct ReplayObservations {
    status_source: String,
    power_source: String,
    status: Option<String>,
    power_level: Option<String>,
}

impl Default for ReplayObservations {
    fn default() -> Self {
        Self::for_config(&TrackerConfig::default())
    }
}

impl ReplayObservations {
    /// Empty store listening to the default signal ids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store listening to the signal ids named in `config`.
    pub fn for_config(config: &TrackerConfig) -> Self {
        Self {
            status_source: config.status_source.clone(),
            power_source: config.power_source.clone(),
            status: None,
            power_level: None,
        }
    }

    /// Record a value for `signal_id`.  Returns `false` if the id is not
    /// one of the tracked sources.
    pub fn apply(&mut self, signal_id: &str, value: &str) -> bool {
        if signal_id == self.status_source {
            self.set_status(value);
        } else if signal_id == self.power_source {
            self.set_power_level(value);
        } else {
            trace!("Ignoring update for untracked signal {}", signal_id);
            return false;
        }
        true
    }

    pub fn set_status(&mut self, value: &str) {
        self.status = Some(value.to_owned());
    }

    pub fn set_power_level(&mut self, value: &str) {
        self.power_level = Some(value.to_owned());
    }

    /// Forget both signals, as if the appliance went unavailable.
    pub fn clear(&mut self) {
        self.status = None;
        self.power_level = None;
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn power_level(&self) -> Option<&str> {
        self.power_level.as_deref()
    }
}

impl ObservationPort for ReplayObservations {
    fn read_status(&mut self) -> Option<String> {
        self.status.clone()
    }

    fn read_power_level(&mut self) -> Option<String> {
        self.power_level.clone()
    }
}

//! Consumption integrator.
//!
//! Called by the host on a fixed cadence and on every observation change.
//! Each step turns the time since the previous step into grams burned:
//!
//! ```text
//!   elapsed_h = now - last_update          (watermark always advances)
//!   rate      = base_rate(level) * correction(level)
//!   burned    = rate * elapsed_h           (only in an active status)
//! ```

use log::warn;

use super::level::PowerLevel;
use super::state::TrackerState;
use super::timestamp::Timestamp;

/// The appliance's two proxy signals, as last reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub status: String,
    pub power_level: String,
}

impl Observation {
    pub fn new(status: impl Into<String>, power_level: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            power_level: power_level.into(),
        }
    }
}

/// What a single integration step did.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationOutcome {
    /// The clock did not advance; only the watermark moved.
    NoElapsedTime,
    /// Status or power level not reported yet.
    MissingObservation,
    /// The appliance is not in a consuming status.
    Inactive,
    /// Consuming status.  `grams` is zero only if the effective rate is zero.
    Burned {
        level: PowerLevel,
        grams: f64,
        /// The observed level was not configured and a fallback rate was used.
        used_fallback_rate: bool,
    },
}

impl IntegrationOutcome {
    /// Grams removed from the tank by this step.
    pub fn consumed_g(&self) -> f64 {
        match self {
            Self::Burned { grams, .. } => *grams,
            _ => 0.0,
        }
    }

    /// Whether the step mutated level or session state.
    pub fn changed_state(&self) -> bool {
        self.consumed_g() > 0.0
    }
}

impl TrackerState {
    /// Integrate consumption from the last step up to `now`.
    ///
    /// The watermark is moved to `now` before anything else, even when the
    /// interval is non-positive, so a clock step backwards never produces a
    /// later burst of phantom consumption.
    pub fn integrate(&mut self, now: Timestamp, observation: Option<&Observation>) -> IntegrationOutcome {
        let elapsed_h = now.hours_since(self.last_update);
        self.last_update = now;

        if elapsed_h <= 0.0 {
            return IntegrationOutcome::NoElapsedTime;
        }

        let Some(observation) = observation else {
            return IntegrationOutcome::MissingObservation;
        };

        if !self.is_active_status(&observation.status) {
            return IntegrationOutcome::Inactive;
        }

        let level = PowerLevel::parse(&observation.power_level);
        let (base_rate, used_fallback_rate) = match self.rates.get(&level) {
            Some(rate) => (rate, false),
            None => {
                warn!(
                    "Appliance is active (status: {}) but power level '{}' is not configured; \
                     update the configured power levels",
                    observation.status, level
                );
                (self.rates.fallback_rate(), true)
            }
        };

        let grams = base_rate * self.corrections.get(&level) * elapsed_h;
        if grams > 0.0 {
            self.record_consumption(&level, grams);
        }

        IntegrationOutcome::Burned {
            level,
            grams,
            used_fallback_rate,
        }
    }

    fn record_consumption(&mut self, level: &PowerLevel, grams: f64) {
        *self
            .session_consumed_by_level
            .entry(level.clone())
            .or_insert(0.0) += grams;
        self.session_consumed_g += grams;
        self.store_level(self.current_level_g - grams);
    }
}

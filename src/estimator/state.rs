//! The tracker state aggregate.
//!
//! [`TrackerState`] is owned by exactly one tracker and mutated only through
//! its own methods: [`integrate`](TrackerState::integrate) in the
//! integrator module and the calibration / reset flows in the calibration
//! module.  Every mutation keeps two invariants:
//!
//! * `0 <= level <= capacity`
//! * `session_consumed == sum(session_consumed_by_level)`

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{CalibrationConfig, TrackerConfig};

use super::correction::CorrectionTable;
use super::level::PowerLevel;
use super::rates::RateTable;
use super::timestamp::Timestamp;

/// Live estimation state for one appliance.
#[derive(Debug, Clone)]
pub struct TrackerState {
    pub(crate) tank_capacity_g: f64,
    pub(crate) current_level_g: f64,
    pub(crate) active_statuses: BTreeSet<String>,
    pub(crate) rates: RateTable,
    pub(crate) corrections: CorrectionTable,
    pub(crate) session_consumed_g: f64,
    pub(crate) session_consumed_by_level: BTreeMap<PowerLevel, f64>,
    pub(crate) last_update: Timestamp,
    pub(crate) calibration: CalibrationConfig,
}

impl TrackerState {
    /// Build a full-tank state.
    ///
    /// A non-finite or negative capacity is treated as zero.
    pub fn new(
        tank_capacity_g: f64,
        active_statuses: impl IntoIterator<Item = String>,
        rates: RateTable,
        calibration: CalibrationConfig,
        now: Timestamp,
    ) -> Self {
        let tank_capacity_g = if tank_capacity_g.is_finite() && tank_capacity_g > 0.0 {
            tank_capacity_g
        } else {
            0.0
        };
        Self {
            tank_capacity_g,
            current_level_g: tank_capacity_g,
            active_statuses: active_statuses.into_iter().collect(),
            rates,
            corrections: CorrectionTable::new(),
            session_consumed_g: 0.0,
            session_consumed_by_level: BTreeMap::new(),
            last_update: now,
            calibration,
        }
    }

    /// Build a full-tank state from a resolved configuration.
    pub fn from_config(config: &TrackerConfig, now: Timestamp) -> Self {
        let rates = RateTable::build(&config.effective_power_levels(), config.max_rate_g_per_h());
        Self::new(
            config.tank_capacity_g(),
            config.active_statuses.iter().cloned(),
            rates,
            config.calibration,
            now,
        )
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn tank_capacity_g(&self) -> f64 {
        self.tank_capacity_g
    }

    pub fn current_level_g(&self) -> f64 {
        self.current_level_g
    }

    pub fn session_consumed_g(&self) -> f64 {
        self.session_consumed_g
    }

    pub fn session_consumed_by_level(&self) -> &BTreeMap<PowerLevel, f64> {
        &self.session_consumed_by_level
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn corrections(&self) -> &CorrectionTable {
        &self.corrections
    }

    pub fn last_update(&self) -> Timestamp {
        self.last_update
    }

    pub fn calibration_config(&self) -> &CalibrationConfig {
        &self.calibration
    }

    /// Whether `status` counts as burning fuel.
    pub fn is_active_status(&self, status: &str) -> bool {
        self.active_statuses.contains(status)
    }

    /// Remaining fuel as a fraction of capacity, in `[0, 1]`.
    pub fn fill_fraction(&self) -> f64 {
        if self.tank_capacity_g <= 0.0 {
            return 0.0;
        }
        (self.current_level_g / self.tank_capacity_g).clamp(0.0, 1.0)
    }

    /// Sum of the per-level session accumulators.
    pub fn session_by_level_total(&self) -> f64 {
        self.session_consumed_by_level.values().sum()
    }

    // ── Mutation helpers (crate-internal) ─────────────────────

    /// Clamp `grams` into `[0, capacity]` and store it as the level.
    pub(crate) fn store_level(&mut self, grams: f64) {
        self.current_level_g = self.clamp_level(grams);
    }

    pub(crate) fn clamp_level(&self, grams: f64) -> f64 {
        if grams.is_nan() {
            return 0.0;
        }
        grams.clamp(0.0, self.tank_capacity_g)
    }

    pub(crate) fn reset_session(&mut self) {
        self.session_consumed_g = 0.0;
        self.session_consumed_by_level.clear();
    }
}

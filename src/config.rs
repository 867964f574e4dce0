//! Tracker configuration parameters
//!
//! All tunable parameters for one tracked appliance.  A host resolves the
//! stored base configuration and any user overrides into a single immutable
//! [`TrackerConfig`] (see [`TrackerConfig::with_overlay`]) before building a
//! tracker from it.
//!
//! Masses are configured in kilograms (what users read off a pellet bag);
//! the estimator works in grams.

use serde::{Deserialize, Deserializer, Serialize};

use crate::app::ports::ConfigError;

/// Power levels assumed when none are configured.
pub const DEFAULT_POWER_LEVELS: [&str; 5] = ["1", "2", "3", "4", "5"];

/// Statuses that mean "burning" on common stove controllers.
pub const DEFAULT_ACTIVE_STATUSES: [&str; 2] = ["WORK", "START"];

/// Per-appliance configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // --- Identity ---
    /// Display name
    pub name: String,
    /// Stable id; scopes the persisted state key
    pub instance_id: String,

    // --- Observation sources ---
    /// Signal id reporting the operating status
    pub status_source: String,
    /// Signal id reporting the power level
    pub power_source: String,

    // --- Tank ---
    /// Tank capacity in kg
    pub tank_size_kg: f64,

    // --- Rate model ---
    /// Status values that count as consuming fuel
    #[serde(deserialize_with = "list_or_csv")]
    pub active_statuses: Vec<String>,
    /// Power levels in ascending order; empty means [`DEFAULT_POWER_LEVELS`]
    #[serde(deserialize_with = "list_or_csv")]
    pub power_levels: Vec<String>,
    /// Consumption at the highest power level, kg/h
    pub max_rate_kg_per_hour: f64,

    // --- Timing ---
    /// Periodic integration cadence (seconds)
    pub update_interval_secs: u32,

    // --- Learning ---
    pub calibration: CalibrationConfig,
}

/// Tuning for the adaptive rate correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Damping constant of the single-step EWMA update
    pub alpha: f64,
    /// A refill only calibrates if the level is below this fraction of capacity
    pub refill_threshold_fraction: f64,
    /// Clamp for actual / estimated consumption per calibration event
    pub error_ratio_bounds: (f64, f64),
    /// Hard bounds for any learned correction factor
    pub factor_bounds: (f64, f64),
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            alpha: 0.15,
            refill_threshold_fraction: 0.1,
            error_ratio_bounds: (0.5, 2.0),
            factor_bounds: (0.1, 5.0),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            name: "Pellet Stove".to_owned(),
            instance_id: "default".to_owned(),
            status_source: "sensor.stove_status".to_owned(),
            power_source: "sensor.stove_power".to_owned(),
            tank_size_kg: 15.0,
            active_statuses: DEFAULT_ACTIVE_STATUSES.iter().map(|s| (*s).to_owned()).collect(),
            power_levels: DEFAULT_POWER_LEVELS.iter().map(|s| (*s).to_owned()).collect(),
            max_rate_kg_per_hour: 1.8,
            update_interval_secs: 60, // 1/min
            calibration: CalibrationConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Tank capacity in grams.
    pub fn tank_capacity_g(&self) -> f64 {
        self.tank_size_kg * 1000.0
    }

    /// Rate at the highest power level in g/h.
    pub fn max_rate_g_per_h(&self) -> f64 {
        self.max_rate_kg_per_hour * 1000.0
    }

    /// Configured power levels, or the defaults when the list is empty.
    pub fn effective_power_levels(&self) -> Vec<String> {
        if self.power_levels.is_empty() {
            DEFAULT_POWER_LEVELS.iter().map(|s| (*s).to_owned()).collect()
        } else {
            self.power_levels.clone()
        }
    }

    /// Apply user overrides on top of this configuration; overrides win.
    pub fn with_overlay(mut self, overlay: &ConfigOverlay) -> Self {
        if let Some(name) = &overlay.name {
            self.name.clone_from(name);
        }
        if let Some(source) = &overlay.status_source {
            self.status_source.clone_from(source);
        }
        if let Some(source) = &overlay.power_source {
            self.power_source.clone_from(source);
        }
        if let Some(size) = overlay.tank_size_kg {
            self.tank_size_kg = size;
        }
        if let Some(statuses) = &overlay.active_statuses {
            self.active_statuses.clone_from(statuses);
        }
        if let Some(levels) = &overlay.power_levels {
            self.power_levels.clone_from(levels);
        }
        if let Some(rate) = overlay.max_rate_kg_per_hour {
            self.max_rate_kg_per_hour = rate;
        }
        if let Some(interval) = overlay.update_interval_secs {
            self.update_interval_secs = interval;
        }
        if let Some(calibration) = overlay.calibration {
            self.calibration = calibration;
        }
        self
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instance_id.is_empty() {
            return Err(ConfigError::ValidationFailed("instance_id must not be empty"));
        }
        if !self.tank_size_kg.is_finite() || self.tank_size_kg <= 0.0 {
            return Err(ConfigError::ValidationFailed("tank_size_kg must be > 0"));
        }
        if !self.max_rate_kg_per_hour.is_finite() || self.max_rate_kg_per_hour < 0.0 {
            return Err(ConfigError::ValidationFailed("max_rate_kg_per_hour must be >= 0"));
        }
        if !(1..=3600).contains(&self.update_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "update_interval_secs must be 1–3600",
            ));
        }
        self.calibration.validate()
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::ValidationFailed("calibration.alpha must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.refill_threshold_fraction) {
            return Err(ConfigError::ValidationFailed(
                "calibration.refill_threshold_fraction must be 0.0–1.0",
            ));
        }
        let (lo, hi) = self.error_ratio_bounds;
        if !(lo > 0.0 && lo <= 1.0 && hi >= 1.0 && hi.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "calibration.error_ratio_bounds must satisfy 0 < lo <= 1 <= hi",
            ));
        }
        let (lo, hi) = self.factor_bounds;
        if !(lo > 0.0 && lo <= 1.0 && hi >= 1.0 && hi.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "calibration.factor_bounds must satisfy 0 < lo <= 1 <= hi",
            ));
        }
        Ok(())
    }
}

/// User overrides layered over a stored [`TrackerConfig`].
///
/// Every field is optional; `None` keeps the base value.  `instance_id` is
/// deliberately absent since it keys persisted state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverlay {
    pub name: Option<String>,
    pub status_source: Option<String>,
    pub power_source: Option<String>,
    pub tank_size_kg: Option<f64>,
    #[serde(deserialize_with = "opt_list_or_csv")]
    pub active_statuses: Option<Vec<String>>,
    #[serde(deserialize_with = "opt_list_or_csv")]
    pub power_levels: Option<Vec<String>>,
    pub max_rate_kg_per_hour: Option<f64>,
    pub update_interval_secs: Option<u32>,
    pub calibration: Option<CalibrationConfig>,
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrCsv {
    List(Vec<String>),
    Csv(String),
}

impl ListOrCsv {
    fn into_list(self) -> Vec<String> {
        match self {
            Self::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            Self::Csv(raw) => split_csv(&raw),
        }
    }
}

fn list_or_csv<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    ListOrCsv::deserialize(deserializer).map(ListOrCsv::into_list)
}

fn opt_list_or_csv<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    Option::<ListOrCsv>::deserialize(deserializer).map(|v| v.map(ListOrCsv::into_list))
}

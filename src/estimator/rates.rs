//! Base consumption rate model.
//!
//! Maps every configured power level to a base burn rate in grams per hour
//! by linear interpolation against the configured maximum rate:
//!
//! * all levels numeric (and the largest is positive): each level gets
//!   `level / max_level * max_rate`, so sparse sets like `1, 3, 7` scale
//!   against the real maximum;
//! * otherwise: the i-th level (1-based, configuration order, assumed
//!   ascending) gets `i / count * max_rate`.
//!
//! Rates are truncated to whole grams per hour.

use log::warn;

use super::correction::CorrectionTable;
use super::level::{PowerLevel, parse_decimal};

/// One row of the rate table.
#[derive(Debug, Clone, PartialEq)]
pub struct RateEntry {
    pub level: PowerLevel,
    /// Base rate before correction, in g/h.
    pub grams_per_hour: f64,
}

/// Base rates keyed by normalised power level, in configuration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    entries: Vec<RateEntry>,
}

impl RateTable {
    /// Interpolate base rates for `levels` against `max_rate_g_per_h`.
    pub fn build<S: AsRef<str>>(levels: &[S], max_rate_g_per_h: f64) -> Self {
        let mut table = Self::default();
        if levels.is_empty() {
            return table;
        }

        let numeric: Option<Vec<f64>> = levels.iter().map(|l| parse_decimal(l.as_ref())).collect();
        let max_level = numeric
            .as_deref()
            .and_then(|values| values.iter().copied().reduce(f64::max));

        match (numeric, max_level) {
            (Some(values), Some(max_level)) if max_level > 0.0 => {
                for (raw, value) in levels.iter().zip(values) {
                    table.insert(PowerLevel::parse(raw.as_ref()), value / max_level * max_rate_g_per_h);
                }
            }
            _ => {
                let count = levels.len() as f64;
                for (index, raw) in levels.iter().enumerate() {
                    let position = (index + 1) as f64;
                    table.insert(PowerLevel::parse(raw.as_ref()), position / count * max_rate_g_per_h);
                }
            }
        }
        table
    }

    fn insert(&mut self, level: PowerLevel, rate: f64) {
        let truncated = rate.trunc();
        let grams_per_hour = if truncated > 0.0 { truncated } else { 0.0 };

        if let Some(existing) = self.entries.iter_mut().find(|e| e.level == level) {
            warn!(
                "Power level '{}' configured more than once; using the later rate {} g/h",
                level, grams_per_hour
            );
            existing.grams_per_hour = grams_per_hour;
        } else {
            self.entries.push(RateEntry {
                level,
                grams_per_hour,
            });
        }
    }

    /// Base rate for `level`, if configured.
    pub fn get(&self, level: &PowerLevel) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| &e.level == level)
            .map(|e| e.grams_per_hour)
    }

    /// Rate used when an active appliance reports an unconfigured level:
    /// level `1` if present, else the first configured level, else zero.
    pub fn fallback_rate(&self) -> f64 {
        self.get(&PowerLevel::lowest())
            .or_else(|| self.entries.first().map(|e| e.grams_per_hour))
            .unwrap_or(0.0)
    }

    /// Base rates multiplied by their learned correction, truncated to g/h.
    pub fn effective_rates(&self, corrections: &CorrectionTable) -> Vec<RateEntry> {
        self.entries
            .iter()
            .map(|e| RateEntry {
                level: e.level.clone(),
                grams_per_hour: (e.grams_per_hour * corrections.get(&e.level)).trunc(),
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RateEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

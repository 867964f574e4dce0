//! Per-level multiplicative correction factors.

use std::collections::BTreeMap;

use log::warn;

use super::level::PowerLevel;

/// Learned multipliers applied on top of the base rate table.
///
/// Absent levels read as the neutral factor `1.0`.  Every stored factor is
/// finite and strictly positive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionTable {
    factors: BTreeMap<PowerLevel, f64>,
}

impl CorrectionTable {
    pub const NEUTRAL: f64 = 1.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Factor for `level`, or [`Self::NEUTRAL`] if nothing was learned yet.
    pub fn get(&self, level: &PowerLevel) -> f64 {
        self.factors.get(level).copied().unwrap_or(Self::NEUTRAL)
    }

    /// Store a factor.  Returns `false` (and stores nothing) if the factor
    /// is not a finite positive number.
    pub fn set(&mut self, level: PowerLevel, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            warn!("Rejecting correction factor {} for level '{}'", factor, level);
            return false;
        }
        self.factors.insert(level, factor);
        true
    }

    /// Rebuild a table from persisted `(key, factor)` pairs.
    ///
    /// Keys are re-normalised; invalid factors are dropped.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let mut table = Self::new();
        for (key, factor) in entries {
            table.set(PowerLevel::parse(key), factor);
        }
        table
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PowerLevel, f64)> {
        self.factors.iter().map(|(level, factor)| (level, *factor))
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

//! Wall-clock timestamps for the integrator.

use core::fmt;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Milliseconds since the Unix epoch.
///
/// The estimator never reads a clock itself; hosts pass `now` into every
/// operation, which keeps replay and tests deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Shift by a (possibly negative) number of milliseconds.
    pub const fn offset_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Signed hours from `earlier` to `self`.  Negative if the clock went back.
    pub fn hours_since(self, earlier: Self) -> f64 {
        (self.0 as f64 - earlier.0 as f64) / MILLIS_PER_HOUR
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

//! Power-level identifiers.
//!
//! Appliances report their power level as free text.  Numeric readings are
//! canonicalised once at the observation boundary, so `"2"`, `"2.0"` and
//! `" 2.7 "` all map to the same rate-table key.  Anything that does not
//! parse as a finite decimal is kept verbatim as an opaque name.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A normalised power-level key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PowerLevel {
    /// Decimal reading truncated toward zero.
    Numeric(i64),
    /// Non-numeric identifier, stored exactly as reported.
    Named(String),
}

impl PowerLevel {
    /// Normalise a raw power reading.
    pub fn parse(raw: &str) -> Self {
        match parse_decimal(raw) {
            Some(value) => Self::Numeric(value.trunc() as i64),
            None => Self::Named(raw.to_owned()),
        }
    }

    /// The level used as the preferred fallback when an unknown level is observed.
    pub const fn lowest() -> Self {
        Self::Numeric(1)
    }
}

/// Parse `raw` as a finite decimal number, tolerating surrounding whitespace.
pub(crate) fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

impl fmt::Display for PowerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl From<&str> for PowerLevel {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl Serialize for PowerLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PowerLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

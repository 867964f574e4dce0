//! Durable tracker state.
//!
//! The level, the learned correction factors and the open session are
//! written as one postcard blob per tracker under
//! `pelletgauge::state_<instance_id>`.
//!
//! Base rates are written alongside for inspection but never read back:
//! they are always rebuilt from the current configuration, so changing the
//! power levels or the maximum rate takes effect immediately while the
//! learned corrections survive.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::error::{CodecError, Result};
use crate::estimator::{CorrectionTable, PowerLevel, TrackerState};

pub const STATE_NAMESPACE: &str = "pelletgauge";
pub const SCHEMA_VERSION: u16 = 1;

/// Storage key for one tracker instance.
pub fn state_key(instance_id: &str) -> String {
    format!("state_{}", instance_id)
}

/// Serializable snapshot of the durable part of a [`TrackerState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u16,
    pub current_level_g: f64,
    pub session_consumed_g: f64,
    pub correction_factors: BTreeMap<String, f64>,
    pub session_consumed_by_level: BTreeMap<String, f64>,
    /// Informational only; ignored on restore.
    pub base_rates: BTreeMap<String, f64>,
}

impl PersistedState {
    pub fn capture(state: &TrackerState) -> Self {
        Self {
            version: SCHEMA_VERSION,
            current_level_g: state.current_level_g(),
            session_consumed_g: state.session_consumed_g(),
            correction_factors: state
                .corrections()
                .iter()
                .map(|(level, factor)| (level.to_string(), factor))
                .collect(),
            session_consumed_by_level: state
                .session_consumed_by_level()
                .iter()
                .map(|(level, grams)| (level.to_string(), *grams))
                .collect(),
            base_rates: state
                .rates()
                .iter()
                .map(|e| (e.level.to_string(), e.grams_per_hour))
                .collect(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_allocvec(self).map_err(|_| CodecError::Encode)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let state: Self = postcard::from_bytes(bytes).map_err(|_| CodecError::Decode)?;
        if state.version != SCHEMA_VERSION {
            return Err(CodecError::UnsupportedVersion(state.version).into());
        }
        Ok(state)
    }
}

impl TrackerState {
    /// Overlay persisted values onto a freshly configured state.
    ///
    /// The level is clamped to the (possibly reconfigured) capacity, keys
    /// are re-normalised, invalid numbers are dropped and the session total
    /// is recomputed from the per-level map.
    pub fn restore(&mut self, persisted: &PersistedState) {
        self.store_level(persisted.current_level_g);

        let (factor_lo, factor_hi) = self.calibration.factor_bounds;
        self.corrections = CorrectionTable::from_entries(persisted.correction_factors.iter().map(
            |(key, &factor)| {
                // Invalid factors pass through unchanged so the table rejects them.
                if factor.is_finite() && factor > 0.0 && !(factor_lo..=factor_hi).contains(&factor) {
                    warn!(
                        "Clamping restored correction factor {} for level '{}' into [{}, {}]",
                        factor, key, factor_lo, factor_hi
                    );
                    (key.as_str(), factor.clamp(factor_lo, factor_hi))
                } else {
                    (key.as_str(), factor)
                }
            },
        ));

        self.session_consumed_by_level.clear();
        for (key, &grams) in &persisted.session_consumed_by_level {
            if !grams.is_finite() || grams <= 0.0 {
                warn!("Dropping invalid session consumption {} for level '{}'", grams, key);
                continue;
            }
            *self
                .session_consumed_by_level
                .entry(PowerLevel::parse(key))
                .or_insert(0.0) += grams;
        }

        let total = self.session_by_level_total();
        if (total - persisted.session_consumed_g).abs() > 1e-6 {
            debug!(
                "Persisted session total {:.1} g disagrees with per-level sum {:.1} g; using the sum",
                persisted.session_consumed_g, total
            );
        }
        self.session_consumed_g = total;

        debug!(
            "Restored state: level={:.1} kg, correction factors={:?}, base rates (config)={:?}",
            self.current_level_g / 1000.0,
            self.corrections,
            self.rates
        );
    }
}

/// Write the durable state of `state` for `instance_id`.
pub fn save(storage: &mut impl StoragePort, instance_id: &str, state: &TrackerState) -> Result<()> {
    let bytes = PersistedState::capture(state).encode()?;
    storage.write(STATE_NAMESPACE, &state_key(instance_id), &bytes)?;
    Ok(())
}

/// Read the durable state for `instance_id`, `Ok(None)` if nothing was saved.
pub fn load(storage: &impl StoragePort, instance_id: &str) -> Result<Option<PersistedState>> {
    match storage.read(STATE_NAMESPACE, &state_key(instance_id)) {
        Ok(bytes) => PersistedState::decode(&bytes).map(Some),
        Err(StorageError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

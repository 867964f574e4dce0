//! Calibration engine and the two reset flows that drive it.
//!
//! A refill or a manual level correction reveals how much fuel was really
//! burned since the last reset.  Comparing that with the session estimate
//! gives an error ratio, which nudges each level's correction factor in
//! proportion to that level's share of the session:
//!
//! ```text
//!   ratio  = clamp(actual / estimated, 0.5, 2.0)
//!   weight = consumed_by_level[L] / estimated
//!   f[L]  *= 1 + alpha * weight * (ratio - 1)
//! ```
//!
//! Calibration itself never touches the level or the session counters;
//! [`TrackerState::refill`] and [`TrackerState::set_level`] reset those
//! after calibrating.

use core::fmt;

use log::{debug, info, warn};

use super::level::PowerLevel;
use super::state::TrackerState;
use super::timestamp::Timestamp;

/// One correction factor change.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorUpdate {
    pub level: PowerLevel,
    /// Share of the session's estimated consumption attributed to `level`.
    pub weight: f64,
    pub old_factor: f64,
    pub new_factor: f64,
}

/// Result of a completed calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReport {
    pub estimated_g: f64,
    pub actual_g: f64,
    /// `actual / estimated` before clamping.
    pub raw_ratio: f64,
    /// The ratio actually applied.
    pub error_ratio: f64,
    pub updates: Vec<FactorUpdate>,
}

/// Why a calibration did not run.  None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationSkip {
    /// Nothing was estimated this session, so there is nothing to correct.
    NoSessionConsumption,
    /// Refill with the tank still above the refill threshold (a top-off).
    AboveRefillThreshold,
    /// Manual level implies zero or negative consumption.
    NonPositiveImpliedConsumption,
    /// Manual level set without asking for calibration.
    NotRequested,
    /// Measured consumption was not a finite number.
    InvalidMeasurement,
}

impl fmt::Display for CalibrationSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSessionConsumption => write!(f, "no session consumption recorded"),
            Self::AboveRefillThreshold => write!(f, "level above refill threshold"),
            Self::NonPositiveImpliedConsumption => write!(f, "implied consumption is negative or zero"),
            Self::NotRequested => write!(f, "calibration not requested"),
            Self::InvalidMeasurement => write!(f, "measured consumption is not finite"),
        }
    }
}

pub type CalibrationResult = Result<CalibrationReport, CalibrationSkip>;

/// Outcome of [`TrackerState::refill`].
#[derive(Debug, Clone, PartialEq)]
pub struct RefillOutcome {
    pub previous_level_g: f64,
    pub calibration: CalibrationResult,
}

/// Outcome of [`TrackerState::set_level`].
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSetOutcome {
    pub previous_level_g: f64,
    /// The level actually stored, after clamping.
    pub new_level_g: f64,
    pub calibration: CalibrationResult,
}

impl TrackerState {
    /// Reconcile the session estimate against `actual_g` grams really burned.
    pub fn calibrate(&mut self, actual_g: f64) -> CalibrationResult {
        let estimated_g = self.session_consumed_g;
        if estimated_g <= 0.0 {
            return Err(CalibrationSkip::NoSessionConsumption);
        }
        if !actual_g.is_finite() {
            return Err(CalibrationSkip::InvalidMeasurement);
        }

        debug!("Starting calibration. Current factors: {:?}", self.corrections);

        let (ratio_lo, ratio_hi) = self.calibration.error_ratio_bounds;
        let (factor_lo, factor_hi) = self.calibration.factor_bounds;
        let alpha = self.calibration.alpha;

        let raw_ratio = actual_g / estimated_g;
        let error_ratio = raw_ratio.clamp(ratio_lo, ratio_hi);

        info!(
            "Auto-calibrating rates. Estimated: {:.2} kg, Actual: {:.2} kg, Ratio: {:.3}",
            estimated_g / 1000.0,
            actual_g / 1000.0,
            error_ratio
        );

        let mut updates = Vec::with_capacity(self.session_consumed_by_level.len());
        for (level, &consumed) in &self.session_consumed_by_level {
            if consumed <= 0.0 {
                continue;
            }
            let weight = consumed / estimated_g;
            let old_factor = self.corrections.get(level);
            let new_factor =
                (old_factor * (1.0 + alpha * weight * (error_ratio - 1.0))).clamp(factor_lo, factor_hi);

            debug!(
                "Calibrating level {}: weight={:.2}, old factor={:.3}, new factor={:.3}",
                level, weight, old_factor, new_factor
            );
            self.corrections.set(level.clone(), new_factor);
            updates.push(FactorUpdate {
                level: level.clone(),
                weight,
                old_factor,
                new_factor,
            });
        }

        debug!(
            "Calibration complete. New effective rates (g/h): {:?}",
            self.rates.effective_rates(&self.corrections)
        );

        Ok(CalibrationReport {
            estimated_g,
            actual_g,
            raw_ratio,
            error_ratio,
            updates,
        })
    }

    /// The tank was filled to capacity.
    ///
    /// Calibrates (assuming the whole tank was burned) only when the level
    /// is below the refill threshold; a top-off of a half-full tank carries
    /// no reliable signal.  Always ends with a full tank, an empty session
    /// and the watermark at `now`.
    pub fn refill(&mut self, now: Timestamp) -> RefillOutcome {
        let previous_level_g = self.current_level_g;
        info!("Refill requested. Current level: {:.2} kg", previous_level_g / 1000.0);

        let threshold_g = self.tank_capacity_g * self.calibration.refill_threshold_fraction;
        let calibration = if previous_level_g >= threshold_g {
            Err(CalibrationSkip::AboveRefillThreshold)
        } else {
            self.calibrate(self.tank_capacity_g)
        };

        if let Err(skip) = calibration {
            debug!(
                "Skipping calibration during refill ({}). Level {:.2} kg, threshold {:.2} kg, session {:.2} kg",
                skip,
                previous_level_g / 1000.0,
                threshold_g / 1000.0,
                self.session_consumed_g / 1000.0
            );
        }

        self.store_level(self.tank_capacity_g);
        self.reset_session();
        self.last_update = now;

        info!("Refill complete. New level: {:.2} kg", self.current_level_g / 1000.0);
        RefillOutcome {
            previous_level_g,
            calibration,
        }
    }

    /// Manually correct the level to `target_g` (clamped to the tank).
    ///
    /// With `calibrate`, the correction is treated as ground truth: the
    /// implied consumption `(level + session) - target` feeds the
    /// calibration engine if it is positive.  The level is applied and the
    /// session reset either way.
    pub fn set_level(&mut self, target_g: f64, calibrate: bool) -> LevelSetOutcome {
        let previous_level_g = self.current_level_g;
        let new_level_g = self.clamp_level(target_g);
        info!(
            "Manual level set requested. Target: {:.2} kg, calibrate: {}, current: {:.2} kg",
            new_level_g / 1000.0,
            calibrate,
            previous_level_g / 1000.0
        );

        let calibration = if !calibrate {
            Err(CalibrationSkip::NotRequested)
        } else if self.session_consumed_g <= 0.0 {
            debug!("Skipping calibration: no session consumption recorded");
            Err(CalibrationSkip::NoSessionConsumption)
        } else {
            let implied_g = (previous_level_g + self.session_consumed_g) - new_level_g;
            if implied_g > 0.0 {
                self.calibrate(implied_g)
            } else {
                warn!(
                    "Cannot calibrate: implied consumption {:.2} kg is negative or zero",
                    implied_g / 1000.0
                );
                Err(CalibrationSkip::NonPositiveImpliedConsumption)
            }
        };

        self.reset_session();
        self.current_level_g = new_level_g;

        info!("Manual level set complete. New level: {:.2} kg", new_level_g / 1000.0);
        LevelSetOutcome {
            previous_level_g,
            new_level_g,
            calibration,
        }
    }
}

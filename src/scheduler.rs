//! Update scheduler.
//!
//! Decides *when* the tracker integrates.  Two triggers exist:
//!
//! ```text
//!  ┌──────────────┐   ┌──────────────────────┐
//!  │ fixed cadence│   │ status / power change│
//!  └──────┬───────┘   └──────────┬───────────┘
//!         │ Periodic             │ ObservationChanged
//!         ▼                      ▼
//!  ┌────────────────────────────────────────┐
//!  │           SchedulerDelegate            │
//!  │   (host forwards to TrackerService)    │
//!  └────────────────────────────────────────┘
//! ```
//!
//! The scheduler holds no reference to the tracker.  It is driven with
//! explicit timestamps, so a replayed trace and a live loop behave the same.

use log::{debug, info, warn};

use crate::app::ports::{SchedulerDelegate, UpdateReason};
use crate::estimator::Timestamp;

/// Most periodic updates replayed one by one by a single
/// [`UpdateScheduler::advance_to`] call.
pub const MAX_CATCH_UP: u32 = 1_440;

/// Fixed-cadence scheduler with change detection on the proxy signals.
#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    interval_ms: i64,
    next_due: Timestamp,
    last_status: Option<String>,
    last_power: Option<String>,
}

impl UpdateScheduler {
    /// First periodic update is due one interval after `start`.
    /// An interval of zero is treated as one second.
    pub fn new(interval_secs: u32, start: Timestamp) -> Self {
        let interval_ms = i64::from(interval_secs.max(1)) * 1000;
        info!("Update scheduler: every {}s", interval_ms / 1000);
        Self {
            interval_ms,
            next_due: start.offset_millis(interval_ms),
            last_status: None,
            last_power: None,
        }
    }

    /// Fire one [`UpdateReason::Periodic`] per interval boundary in
    /// `(previous position, now]`, each stamped with its boundary time.
    ///
    /// A gap longer than [`MAX_CATCH_UP`] intervals is collapsed into a
    /// single update at `now`; the integrator covers any elapsed time in
    /// one step.
    ///
    /// Returns the number of updates fired.
    pub fn advance_to(&mut self, now: Timestamp, delegate: &mut dyn SchedulerDelegate) -> u32 {
        if self.next_due > now {
            return 0;
        }

        let behind_ms = now.as_millis().saturating_sub(self.next_due.as_millis());
        if behind_ms / self.interval_ms >= i64::from(MAX_CATCH_UP) {
            warn!(
                "Scheduler is {}s behind; collapsing missed updates into one at {}",
                behind_ms / 1000,
                now
            );
            delegate.on_update_due(now, UpdateReason::Periodic);
            self.next_due = now.offset_millis(self.interval_ms);
            return 1;
        }

        let mut fired = 0;
        while self.next_due <= now {
            delegate.on_update_due(self.next_due, UpdateReason::Periodic);
            fired += 1;
            match self.next_due.as_millis().checked_add(self.interval_ms) {
                Some(next) => self.next_due = Timestamp::from_millis(next),
                // End of representable time: nothing further can fall due.
                None => break,
            }
        }
        fired
    }

    /// Record the current signal values.  If either differs from the last
    /// recorded value, fire [`UpdateReason::ObservationChanged`] at `now`.
    ///
    /// Returns `true` if an update fired.
    pub fn observe(
        &mut self,
        now: Timestamp,
        status: Option<&str>,
        power: Option<&str>,
        delegate: &mut dyn SchedulerDelegate,
    ) -> bool {
        let changed = self.last_status.as_deref() != status || self.last_power.as_deref() != power;
        if !changed {
            return false;
        }
        debug!(
            "Observation changed at {}: status={:?} power={:?}",
            now, status, power
        );
        self.last_status = status.map(str::to_owned);
        self.last_power = power.map(str::to_owned);
        delegate.on_update_due(now, UpdateReason::ObservationChanged);
        true
    }

    /// When the next periodic update is due.
    pub fn next_due(&self) -> Timestamp {
        self.next_due
    }

    pub fn interval_secs(&self) -> u32 {
        u32::try_from(self.interval_ms / 1000).unwrap_or(u32::MAX)
    }
}

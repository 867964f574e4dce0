//! Tracker service, the hexagonal core.
//!
//! [`TrackerService`] owns one appliance's [`TrackerState`], its listener
//! registry and its lifecycle.  It exposes a platform-agnostic API; all
//! I/O flows through port traits injected at call sites, making the whole
//! service testable with mock adapters.
//!
//! ```text
//!  ObservationPort ──▶ ┌────────────────────────┐ ──▶ EventSink (listeners)
//!                      │     TrackerService      │
//!    StoragePort ◀────▶│ integrate · calibrate   │
//!                      └────────────────────────┘
//! ```
//!
//! Lifecycle: `Uninitialized → Active → Closed`.  Mutating operations
//! outside `Active` return [`Error::Lifecycle`]; nothing else is fatal.

use core::fmt;

use log::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::estimator::{
    IntegrationOutcome, LevelSetOutcome, Observation, RefillOutcome, Timestamp, TrackerState,
};
use crate::persistence;

use super::commands::TrackerCommand;
use super::events::{TrackerEvent, TrackerSnapshot};
use super::listeners::{ListenerHandle, ListenerRegistry};
use super::ports::{EventSink, ObservationPort, StoragePort};

/// Where a tracker is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Active,
    Closed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// TrackerService
// ───────────────────────────────────────────────────────────────

/// Orchestrates estimation, calibration, persistence and notification for
/// one tracked appliance.
pub struct TrackerService {
    config: TrackerConfig,
    state: TrackerState,
    lifecycle: Lifecycle,
    listeners: ListenerRegistry,
    /// State changed since the last successful write.
    persist_pending: bool,
    update_count: u64,
}

impl TrackerService {
    /// Construct the service from a resolved configuration.
    ///
    /// Does **not** load persisted state; call [`initialize`](Self::initialize) next.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let state = TrackerState::from_config(&config, Timestamp::default());
        info!(
            "Tracker '{}' configured: tank {:.1} kg, {} power levels, active statuses {:?}",
            config.name,
            config.tank_size_kg,
            state.rates().len(),
            config.active_statuses
        );
        Ok(Self {
            config,
            state,
            lifecycle: Lifecycle::Uninitialized,
            listeners: ListenerRegistry::new(),
            persist_pending: false,
            update_count: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Overlay persisted state and start tracking from `now`.
    ///
    /// A missing or unreadable blob is not an error: the tracker starts
    /// with a full tank and neutral corrections.
    pub fn initialize(&mut self, now: Timestamp, storage: &impl StoragePort) -> Result<()> {
        if self.lifecycle != Lifecycle::Uninitialized {
            return Err(Error::Lifecycle(self.lifecycle));
        }

        match persistence::load(storage, &self.config.instance_id) {
            Ok(Some(persisted)) => self.state.restore(&persisted),
            Ok(None) => info!("No stored state for '{}', starting full", self.config.instance_id),
            Err(e) => warn!(
                "Discarding stored state for '{}' ({}), starting full",
                self.config.instance_id, e
            ),
        }

        self.state.last_update = now;
        self.lifecycle = Lifecycle::Active;
        let snapshot = self.snapshot();
        info!(
            "Tracker '{}' started at {}% ({:.2} kg)",
            self.config.name, snapshot.level_percent, snapshot.remaining_kg
        );
        self.listeners.emit(&TrackerEvent::Started(snapshot));
        Ok(())
    }

    /// Detach all listeners and refuse further mutation.
    ///
    /// Flushing unsaved state first is the caller's job
    /// (see [`save_if_dirty`](Self::save_if_dirty)).
    pub fn close(&mut self) {
        if self.lifecycle == Lifecycle::Closed {
            return;
        }
        if self.persist_pending {
            warn!("Tracker '{}' closed with unsaved state", self.config.name);
        }
        self.listeners.emit(&TrackerEvent::Closed);
        self.listeners.clear();
        self.lifecycle = Lifecycle::Closed;
        info!("Tracker '{}' closed", self.config.name);
    }

    // ── Per-update orchestration ──────────────────────────────

    /// Run one integration step at `now` using the latest observations.
    pub fn update(&mut self, now: Timestamp, observations: &mut impl ObservationPort) -> Result<IntegrationOutcome> {
        self.ensure_active()?;
        self.update_count += 1;

        let observation = match (observations.read_status(), observations.read_power_level()) {
            (Some(status), Some(power)) => Some(Observation::new(status, power)),
            _ => None,
        };

        let outcome = self.state.integrate(now, observation.as_ref());
        if outcome.changed_state() {
            self.persist_pending = true;
            self.notify_state_changed();
        }
        Ok(outcome)
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (scheduler, refill button, service call).
    pub fn handle_command(
        &mut self,
        cmd: TrackerCommand,
        now: Timestamp,
        observations: &mut impl ObservationPort,
    ) -> Result<()> {
        match cmd {
            TrackerCommand::Update => {
                self.update(now, observations)?;
            }
            TrackerCommand::Refill => {
                self.refill(now)?;
            }
            TrackerCommand::SetLevel { grams, calibrate } => {
                self.set_level(grams, calibrate)?;
            }
        }
        Ok(())
    }

    /// The tank was filled to capacity.
    pub fn refill(&mut self, now: Timestamp) -> Result<RefillOutcome> {
        self.ensure_active()?;
        let outcome = self.state.refill(now);

        if let Ok(report) = &outcome.calibration {
            self.listeners.emit(&TrackerEvent::Calibrated(report.clone()));
        }
        self.listeners.emit(&TrackerEvent::Refilled {
            previous_level_g: outcome.previous_level_g,
        });
        self.persist_pending = true;
        self.notify_state_changed();
        Ok(outcome)
    }

    /// Manually set the level to `grams`, optionally calibrating against it.
    pub fn set_level(&mut self, grams: f64, calibrate: bool) -> Result<LevelSetOutcome> {
        self.ensure_active()?;
        let outcome = self.state.set_level(grams, calibrate);

        if let Ok(report) = &outcome.calibration {
            self.listeners.emit(&TrackerEvent::Calibrated(report.clone()));
        }
        self.listeners.emit(&TrackerEvent::LevelSet {
            previous_level_g: outcome.previous_level_g,
            new_level_g: outcome.new_level_g,
        });
        self.persist_pending = true;
        self.notify_state_changed();
        Ok(outcome)
    }

    // ── Listeners ─────────────────────────────────────────────

    /// Register a listener for tracker events.
    pub fn add_listener(&mut self, sink: impl EventSink + Send + 'static) -> Result<ListenerHandle> {
        if self.lifecycle == Lifecycle::Closed {
            return Err(Error::Lifecycle(self.lifecycle));
        }
        Ok(self.listeners.add(sink)?)
    }

    /// Detach a listener.  Returns `false` for stale handles.
    pub fn remove_listener(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.remove(handle)
    }

    // ── Persistence ───────────────────────────────────────────

    /// Write state if anything changed since the last write.
    /// Returns `true` if a write happened.  A failed write is logged and
    /// retried on the next call.
    pub fn save_if_dirty(&mut self, storage: &mut impl StoragePort) -> bool {
        if !self.persist_pending {
            return false;
        }
        match persistence::save(storage, &self.config.instance_id, &self.state) {
            Ok(()) => {
                self.persist_pending = false;
                debug!("Tracker state saved for '{}'", self.config.instance_id);
                true
            }
            Err(e) => {
                warn!("Tracker state save failed for '{}': {}", self.config.instance_id, e);
                false
            }
        }
    }

    /// Whether state has changed since the last successful write.
    pub fn is_persist_pending(&self) -> bool {
        self.persist_pending
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a display snapshot of the current state.
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot::capture(&self.state)
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Integration steps attempted since construction.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn ensure_active(&self) -> Result<()> {
        if self.lifecycle == Lifecycle::Active {
            Ok(())
        } else {
            Err(Error::Lifecycle(self.lifecycle))
        }
    }

    fn notify_state_changed(&mut self) {
        let snapshot = TrackerSnapshot::capture(&self.state);
        self.listeners.emit(&TrackerEvent::StateChanged(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::kv_store::MemoryStore;
    use crate::adapters::replay::ReplayObservations;

    fn t0() -> Timestamp {
        Timestamp::from_secs(1_700_000_000)
    }

    fn active_service() -> TrackerService {
        let mut svc = TrackerService::new(TrackerConfig::default()).unwrap();
        svc.initialize(t0(), &MemoryStore::new()).unwrap();
        svc
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut config = TrackerConfig::default();
        config.tank_size_kg = -1.0;
        assert!(matches!(TrackerService::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn operations_require_initialization() {
        let mut svc = TrackerService::new(TrackerConfig::default()).unwrap();
        assert_eq!(svc.lifecycle(), Lifecycle::Uninitialized);
        assert_eq!(
            svc.refill(t0()).unwrap_err(),
            Error::Lifecycle(Lifecycle::Uninitialized)
        );
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let mut svc = active_service();
        assert_eq!(
            svc.initialize(t0(), &MemoryStore::new()).unwrap_err(),
            Error::Lifecycle(Lifecycle::Active)
        );
    }

    #[test]
    fn idle_update_does_not_request_persistence() {
        let mut svc = active_service();
        let mut obs = ReplayObservations::new();
        obs.set_status("OFF");
        obs.set_power_level("3");
        let outcome = svc.update(t0().offset_millis(60_000), &mut obs).unwrap();
        assert_eq!(outcome, IntegrationOutcome::Inactive);
        assert!(!svc.is_persist_pending());
        assert_eq!(svc.update_count(), 1);
    }

    #[test]
    fn burning_update_marks_dirty_and_save_clears_it() {
        let mut svc = active_service();
        let mut obs = ReplayObservations::new();
        obs.set_status("WORK");
        obs.set_power_level("5");
        svc.update(t0().offset_millis(60_000), &mut obs).unwrap();
        assert!(svc.is_persist_pending());

        let mut store = MemoryStore::new();
        assert!(svc.save_if_dirty(&mut store));
        assert!(!svc.is_persist_pending());
        assert!(!svc.save_if_dirty(&mut store));
    }

    #[test]
    fn service_can_move_to_another_thread() {
        fn assert_send<T: Send>() {}
        assert_send::<TrackerService>();
    }

    #[test]
    fn closed_tracker_rejects_mutation() {
        let mut svc = active_service();
        svc.close();
        svc.close();
        assert_eq!(svc.lifecycle(), Lifecycle::Closed);
        assert!(svc.set_level(1000.0, false).is_err());
        assert!(svc.add_listener(|_: &TrackerEvent| {}).is_err());
    }
}

//! Port traits: the hexagonal boundary between the estimator and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ TrackerService (domain)
//! ```
//!
//! Driven adapters (observation sources, event sinks, storage, clocks)
//! implement these traits.  The [`TrackerService`](super::service::TrackerService)
//! consumes them via generics, so the estimator never talks to a host
//! platform directly.
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::config::TrackerConfig;
use crate::estimator::Timestamp;

use super::events::TrackerEvent;

// ───────────────────────────────────────────────────────────────
// Observation port (driven adapter: appliance → domain)
// ───────────────────────────────────────────────────────────────

/// Pull-side port: the domain asks for the latest proxy signal values.
///
/// `None` means the appliance has not reported that signal yet; the
/// integrator treats it as "no information" and skips the step.
pub trait ObservationPort {
    /// Current operating status (e.g. `"WORK"`, `"OFF"`).
    fn read_status(&mut self) -> Option<String>;

    /// Current power level as reported (may or may not be numeric).
    fn read_power_level(&mut self) -> Option<String>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → listeners)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`TrackerEvent`]s through this port.
/// Adapters decide where they go (log, UI entity, message bus, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &TrackerEvent);
}

impl<F: FnMut(&TrackerEvent)> EventSink for F {
    fn emit(&mut self, event: &TrackerEvent) {
        self(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists tracker configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration.
    /// Returns [`TrackerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<TrackerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &TrackerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ durable key-value store)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for tracker state blobs.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic: a reader sees either the old or
///   the new blob, never a partial one.
pub trait StoragePort {
    /// Read a value.
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for live hosts.  The estimator itself only ever
/// receives explicit timestamps.
pub trait ClockPort {
    fn now(&self) -> Timestamp;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the service)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when an update is due.
///
/// This decouples the [`UpdateScheduler`](crate::scheduler::UpdateScheduler)
/// from the tracker: the host implements it by forwarding to
/// [`TrackerService::update`](super::service::TrackerService::update).
pub trait SchedulerDelegate {
    /// Called when an integration step should run at `at`.
    fn on_update_due(&mut self, at: Timestamp, reason: UpdateReason);
}

/// Discriminant passed to [`SchedulerDelegate::on_update_due`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    /// The fixed cadence elapsed.
    Periodic,
    /// The status or power signal changed value.
    ObservationChanged,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage.
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}

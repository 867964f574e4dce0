//! Mock port adapters for integration tests.
//!
//! Records every event and storage call so tests can assert on the full
//! history without a real host.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pelletgauge::app::events::TrackerEvent;
use pelletgauge::app::ports::{EventSink, ObservationPort, StorageError, StoragePort};

// ── Observations ──────────────────────────────────────────────

/// Fixed status / power values, changed by the test between updates.
#[derive(Debug, Default)]
pub struct MockObservations {
    pub status: Option<String>,
    pub power: Option<String>,
    pub reads: u32,
}

#[allow(dead_code)]
impl MockObservations {
    pub fn burning(power: &str) -> Self {
        Self {
            status: Some("WORK".into()),
            power: Some(power.into()),
            reads: 0,
        }
    }

    pub fn off() -> Self {
        Self {
            status: Some("OFF".into()),
            power: Some("1".into()),
            reads: 0,
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }
}

impl ObservationPort for MockObservations {
    fn read_status(&mut self) -> Option<String> {
        self.reads += 1;
        self.status.clone()
    }

    fn read_power_level(&mut self) -> Option<String> {
        self.power.clone()
    }
}

// ── Event recorder ────────────────────────────────────────────

/// Clonable sink; every clone appends to the same shared log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<TrackerEvent>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrackerEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Event names in emission order, for compact sequence assertions.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .map(|e| match e {
                TrackerEvent::Started(_) => "started",
                TrackerEvent::StateChanged(_) => "state_changed",
                TrackerEvent::Calibrated(_) => "calibrated",
                TrackerEvent::Refilled { .. } => "refilled",
                TrackerEvent::LevelSet { .. } => "level_set",
                TrackerEvent::Closed => "closed",
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &TrackerEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Storage ───────────────────────────────────────────────────

/// In-memory store whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct MockStorage {
    data: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
    pub writes: u32,
}

#[allow(dead_code)]
impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a key directly, bypassing the failure switch.
    pub fn poke(&mut self, namespace: &str, key: &str, data: &[u8]) {
        self.data.insert(format!("{}::{}", namespace, key), data.to_vec());
    }
}

impl StoragePort for MockStorage {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.data
            .get(&format!("{}::{}", namespace, key))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.writes += 1;
        self.data.insert(format!("{}::{}", namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{}::{}", namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{}::{}", namespace, key))
    }
}

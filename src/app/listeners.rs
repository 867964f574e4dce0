//! Listener registry: fan-out of tracker events to registered sinks.
//!
//! Listeners live in a fixed number of slots.  Registering returns a
//! [`ListenerHandle`] (slot index + generation); removal through the handle
//! is O(1) and a stale handle can never detach a listener that later
//! reused the same slot.

use core::fmt;

use log::debug;

use super::events::TrackerEvent;
use super::ports::EventSink;

/// Maximum number of concurrently registered listeners per tracker.
pub const MAX_LISTENERS: usize = 8;

/// Opaque handle returned by [`ListenerRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    slot: usize,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerError {
    /// All listener slots are taken.
    Full,
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "all {} listener slots in use", MAX_LISTENERS),
        }
    }
}

type BoxedSink = Box<dyn EventSink + Send>;

struct Slot {
    generation: u32,
    sink: Option<BoxedSink>,
}

/// Fixed-capacity set of event sinks.
#[derive(Default)]
pub struct ListenerRegistry {
    slots: heapless::Vec<Slot, MAX_LISTENERS>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink.  No ordering between listeners is guaranteed.
    pub fn add(&mut self, sink: impl EventSink + Send + 'static) -> Result<ListenerHandle, ListenerError> {
        let sink: BoxedSink = Box::new(sink);

        if let Some((slot, entry)) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, entry)| entry.sink.is_none())
        {
            entry.sink = Some(sink);
            return Ok(ListenerHandle {
                slot,
                generation: entry.generation,
            });
        }

        let slot = self.slots.len();
        self.slots
            .push(Slot {
                generation: 0,
                sink: Some(sink),
            })
            .map_err(|_| ListenerError::Full)?;
        debug!("Listener registered in slot {}", slot);
        Ok(ListenerHandle { slot, generation: 0 })
    }

    /// Detach the listener behind `handle`.  Returns `false` if the handle
    /// is stale or was already removed.
    pub fn remove(&mut self, handle: ListenerHandle) -> bool {
        match self.slots.get_mut(handle.slot) {
            Some(entry) if entry.generation == handle.generation && entry.sink.is_some() => {
                entry.sink = None;
                entry.generation = entry.generation.wrapping_add(1);
                true
            }
            _ => false,
        }
    }

    /// Detach every listener.  Outstanding handles become stale.
    pub fn clear(&mut self) {
        for entry in self.slots.iter_mut().filter(|e| e.sink.is_some()) {
            entry.sink = None;
            entry.generation = entry.generation.wrapping_add(1);
        }
    }

    /// Number of attached listeners.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|e| e.sink.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for ListenerRegistry {
    fn emit(&mut self, event: &TrackerEvent) {
        for sink in self.slots.iter_mut().filter_map(|e| e.sink.as_mut()) {
            sink.emit(event);
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("attached", &self.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}

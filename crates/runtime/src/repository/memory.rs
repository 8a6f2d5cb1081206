//! In-memory event log implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use game_core::Event;

use super::{EventRepository, RepositoryError, Result};

/// In-memory event log for testing and development.
///
/// Clones share the same storage, so a test can keep one handle to inspect
/// what a session appended. Offsets are indices.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventLog {
    events: Arc<RwLock<Vec<Event>>>,
    read_only: Arc<AtomicBool>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log pre-filled with `events`, as if they had been appended earlier.
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: Arc::new(RwLock::new(events.into_iter().collect())),
            read_only: Arc::default(),
        }
    }

    /// Snapshot of every stored event.
    pub fn events(&self) -> Result<Vec<Event>> {
        self.load()
    }

    /// Reject further appends with [`RepositoryError::ReadOnly`].
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl EventRepository for InMemoryEventLog {
    fn append(&mut self, event: &Event) -> Result<u64> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(RepositoryError::ReadOnly);
        }
        let mut events = self
            .events
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        events.push(event.clone());
        Ok(events.len() as u64 - 1)
    }

    fn load(&self) -> Result<Vec<Event>> {
        let events = self
            .events
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(events.clone())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> u64 {
        self.events.read().map_or(0, |events| events.len() as u64)
    }
}

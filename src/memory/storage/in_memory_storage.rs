//! Process-local episodic storage.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::memory::episodic::MemoryEvent;
use crate::memory::storage::interface::EpisodicStorage;
use crate::utilities::errors::MemoryError;

/// Episodic storage kept in a per-user map of vectors.
#[derive(Debug, Default)]
pub struct InMemoryEpisodicStorage {
    logs: RwLock<HashMap<String, Vec<MemoryEvent>>>,
}

impl InMemoryEpisodicStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EpisodicStorage for InMemoryEpisodicStorage {
    fn append(&self, event: &MemoryEvent) -> Result<MemoryEvent, MemoryError> {
        let mut logs = self.logs.write();
        let log = logs.entry(event.user_id.clone()).or_default();
        let mut stored = event.clone();
        if let Some(last) = log.last() {
            stored.timestamp = stored.timestamp.max(last.timestamp);
        }
        log.push(stored.clone());
        Ok(stored)
    }

    fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<MemoryEvent>, MemoryError> {
        let logs = self.logs.read();
        let events = match logs.get(user_id) {
            Some(events) => events,
            None => return Ok(Vec::new()),
        };
        let start = events.len().saturating_sub(limit);
        Ok(events[start..].to_vec())
    }

    fn all(&self, user_id: &str) -> Result<Vec<MemoryEvent>, MemoryError> {
        Ok(self.logs.read().get(user_id).cloned().unwrap_or_default())
    }

    fn count(&self, user_id: &str) -> Result<usize, MemoryError> {
        Ok(self.logs.read().get(user_id).map_or(0, Vec::len))
    }

    fn clear(&self, user_id: &str) -> Result<(), MemoryError> {
        self.logs.write().remove(user_id);
        Ok(())
    }
}

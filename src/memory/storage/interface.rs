//! Storage interface for episodic memory backends.

use crate::memory::episodic::MemoryEvent;
use crate::utilities::errors::MemoryError;

/// Append-only event log partitioned by user.
///
/// Backends may be shared between many [`crate::memory::EpisodicMemory`]
/// handles; every operation is scoped to a single `user_id` and must never
/// return another user's events.
pub trait EpisodicStorage: Send + Sync {
    /// Append an event to the end of its user's log and return it as stored.
    ///
    /// A timestamp earlier than the user's latest event is raised to that
    /// event's timestamp. Reading the latest event and appending are a single
    /// atomic step, so concurrent writers cannot interleave between them.
    fn append(&self, event: &MemoryEvent) -> Result<MemoryEvent, MemoryError>;

    /// The last `limit` events for `user_id`, oldest first.
    fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<MemoryEvent>, MemoryError>;

    /// Every event for `user_id` in insertion order.
    fn all(&self, user_id: &str) -> Result<Vec<MemoryEvent>, MemoryError>;

    /// Number of stored events for `user_id`.
    fn count(&self, user_id: &str) -> Result<usize, MemoryError>;

    /// Remove every event for `user_id`.
    fn clear(&self, user_id: &str) -> Result<(), MemoryError>;
}

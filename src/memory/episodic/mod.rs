//! Episodic (short-term) memory: a time-ordered log of one user's exchanges.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::memory::storage::in_memory_storage::InMemoryEpisodicStorage;
use crate::memory::storage::interface::EpisodicStorage;
use crate::utilities::errors::MemoryError;

/// Metadata key that carries an explicit event timestamp.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Default number of events returned by [`EpisodicMemory::retrieve`].
pub const DEFAULT_TOP_K: usize = 4;

/// A single recorded exchange. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvent {
    /// Unique event identifier.
    pub id: String,
    /// Owner of the event.
    pub user_id: String,
    /// What the user asked.
    pub query: String,
    /// What the agent answered.
    pub response: String,
    /// Free-form metadata attached at recording time.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// When the exchange was recorded.
    pub timestamp: DateTime<Utc>,
}

impl MemoryEvent {
    /// Create an event stamped with the current time.
    pub fn new(
        user_id: &str,
        query: &str,
        response: &str,
        metadata: HashMap<String, Value>,
    ) -> Self {
        Self::with_timestamp(user_id, query, response, metadata, Utc::now())
    }

    /// Create an event with an explicit timestamp.
    pub fn with_timestamp(
        user_id: &str,
        query: &str,
        response: &str,
        metadata: HashMap<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            query: query.to_string(),
            response: response.to_string(),
            metadata,
            timestamp,
        }
    }

    /// `"Q: <query> | A: <response>"`.
    pub fn summary_line(&self) -> String {
        format!("Q: {} | A: {}", self.query, self.response)
    }
}

/// Render events as `"Q: .. | A: .."` lines joined by `"; "`.
pub fn render_events(events: &[MemoryEvent]) -> String {
    events
        .iter()
        .map(MemoryEvent::summary_line)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Append-only interaction log for one user.
///
/// The backing [`EpisodicStorage`] may be shared between users; this handle
/// only ever reads and writes its own `user_id` partition.
#[derive(Clone)]
pub struct EpisodicMemory {
    user_id: String,
    storage: Arc<dyn EpisodicStorage>,
}

impl std::fmt::Debug for EpisodicMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpisodicMemory")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl EpisodicMemory {
    /// Create a handle over `storage` for `user_id`.
    pub fn new(user_id: impl Into<String>, storage: Arc<dyn EpisodicStorage>) -> Self {
        Self {
            user_id: user_id.into(),
            storage,
        }
    }

    /// Create a handle with private in-process storage.
    pub fn in_memory(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Arc::new(InMemoryEpisodicStorage::new()))
    }

    /// The user this log belongs to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Record an exchange.
    ///
    /// When `metadata` is `None` it becomes `{"timestamp": <now, RFC 3339>}`.
    /// An RFC 3339 `"timestamp"` entry in supplied metadata sets the event
    /// time; a time earlier than the latest event is clamped up to it so the
    /// log stays non-decreasing.
    pub fn add_event(
        &self,
        query: &str,
        response: &str,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<MemoryEvent, MemoryError> {
        let now = Utc::now();
        let metadata = metadata.unwrap_or_else(|| {
            let mut defaults = HashMap::new();
            defaults.insert(
                TIMESTAMP_KEY.to_string(),
                Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
            defaults
        });

        let requested = metadata
            .get(TIMESTAMP_KEY)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or(now);

        let event = MemoryEvent::with_timestamp(&self.user_id, query, response, metadata, requested);
        let event = self.storage.append(&event)?;
        if event.timestamp != requested {
            log::warn!(
                "Clamped out-of-order timestamp {} for user '{}' to {}",
                requested,
                self.user_id,
                event.timestamp
            );
        }
        log::debug!(
            "Recorded episodic event {} for user '{}'",
            event.id,
            self.user_id
        );
        Ok(event)
    }

    /// The last `top_k` events, oldest first.
    ///
    /// `query` is accepted for future relevance filtering; selection is pure
    /// recency today.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<MemoryEvent>, MemoryError> {
        let _ = query;
        self.storage.recent(&self.user_id, top_k)
    }

    /// Every recorded event in insertion order.
    pub fn events(&self) -> Result<Vec<MemoryEvent>, MemoryError> {
        self.storage.all(&self.user_id)
    }

    /// Number of recorded events.
    pub fn len(&self) -> Result<usize, MemoryError> {
        self.storage.count(&self.user_id)
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> Result<bool, MemoryError> {
        Ok(self.len()? == 0)
    }

    /// Drop this user's whole log.
    pub fn clear(&self) -> Result<(), MemoryError> {
        self.storage.clear(&self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_retrieve_on_empty_store_is_empty() {
        let memory = EpisodicMemory::in_memory("user1");
        assert!(memory.retrieve("anything", 4).unwrap().is_empty());
        assert!(memory.is_empty().unwrap());
    }

    #[test]
    fn test_retrieve_returns_last_min_n_count_in_order() {
        let memory = EpisodicMemory::in_memory("user1");
        for i in 0..6 {
            memory
                .add_event(&format!("q{}", i), &format!("a{}", i), None)
                .unwrap();
        }

        for n in [0usize, 1, 3, 6, 10] {
            let events = memory.retrieve("", n).unwrap();
            assert_eq!(events.len(), n.min(6));
            let expected: Vec<String> = (6 - n.min(6)..6).map(|i| format!("q{}", i)).collect();
            let actual: Vec<String> = events.iter().map(|e| e.query.clone()).collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_default_metadata_carries_timestamp() {
        let memory = EpisodicMemory::in_memory("user1");
        let event = memory.add_event("q", "a", None).unwrap();
        assert!(event.metadata.contains_key(TIMESTAMP_KEY));
    }

    #[test]
    fn test_supplied_metadata_is_kept_verbatim() {
        let memory = EpisodicMemory::in_memory("user1");
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), Value::from("chat"));
        let event = memory.add_event("q", "a", Some(metadata.clone())).unwrap();
        assert_eq!(event.metadata, metadata);
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let memory = EpisodicMemory::in_memory("user1");
        let first = memory.add_event("q1", "a1", None).unwrap();

        let earlier = (first.timestamp - Duration::hours(1)).to_rfc3339();
        let mut metadata = HashMap::new();
        metadata.insert(TIMESTAMP_KEY.to_string(), Value::String(earlier));
        let second = memory.add_event("q2", "a2", Some(metadata)).unwrap();

        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn test_shared_storage_keeps_users_apart() {
        let storage: Arc<dyn EpisodicStorage> = Arc::new(InMemoryEpisodicStorage::new());
        let alice = EpisodicMemory::new("alice", storage.clone());
        let bob = EpisodicMemory::new("bob", storage);

        alice.add_event("qa", "aa", None).unwrap();
        assert!(bob.retrieve("", 10).unwrap().is_empty());
        assert_eq!(alice.len().unwrap(), 1);
    }

    #[test]
    fn test_clamp_holds_across_handles_on_shared_storage() {
        let storage: Arc<dyn EpisodicStorage> = Arc::new(InMemoryEpisodicStorage::new());
        let threads: Vec<_> = (0..4)
            .map(|t| {
                let memory = EpisodicMemory::new("alice", storage.clone());
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let ts = Utc::now() - Duration::seconds(i * 4 + t);
                        let mut metadata = HashMap::new();
                        metadata.insert(TIMESTAMP_KEY.to_string(), Value::String(ts.to_rfc3339()));
                        memory.add_event("q", "a", Some(metadata)).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let events = EpisodicMemory::new("alice", storage).events().unwrap();
        assert_eq!(events.len(), 100);
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_render_events() {
        let events = vec![
            MemoryEvent::new("u", "Tell me about sci-fi movies", "Dune", HashMap::new()),
            MemoryEvent::new("u", "And books?", "Foundation", HashMap::new()),
        ];
        assert_eq!(
            render_events(&events),
            "Q: Tell me about sci-fi movies | A: Dune; Q: And books? | A: Foundation"
        );
    }
}

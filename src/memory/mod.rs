//! Memory system for persona agents.
//!
//! Two layers per user: an append-only episodic log of interactions and a
//! semantic profile recomputed from the tail of that log. Long-term,
//! embedding-indexed memory lives in [`crate::rag`].

pub mod episodic;
pub mod semantic;
pub mod storage;

pub use episodic::{render_events, EpisodicMemory, MemoryEvent};
pub use semantic::SemanticProfile;
pub use storage::{EpisodicSQLiteStorage, EpisodicStorage, InMemoryEpisodicStorage};

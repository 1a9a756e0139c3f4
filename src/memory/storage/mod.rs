//! Storage backends for episodic memory.

pub mod episodic_sqlite_storage;
pub mod in_memory_storage;
pub mod interface;

pub use episodic_sqlite_storage::EpisodicSQLiteStorage;
pub use in_memory_storage::InMemoryEpisodicStorage;
pub use interface::EpisodicStorage;

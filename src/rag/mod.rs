//! Retrieval layer for long-term memory.
//!
//! Provides the embedding abstraction, a deterministic default embedder and
//! the per-user [`index::SemanticIndex`].

pub mod core;
pub mod embeddings;
pub mod index;
pub mod types;

pub use embeddings::{build_embedder, HashEmbedder};
pub use index::SemanticIndex;
pub use types::{Embeddings, SearchResult, SemanticIndexEntry};

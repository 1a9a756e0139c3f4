//! Type definitions for the semantic index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Type alias for a batch of embedding vectors.
pub type Embeddings = Vec<Vec<f32>>;

/// One stored document in a user's partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticIndexEntry {
    /// Content address: hex SHA-256 of the owner and text.
    pub id: String,
    /// Partition key.
    pub user_id: String,
    /// The indexed text.
    pub text: String,
    /// Embedding of `text`.
    pub embedding: Vec<f32>,
    /// Metadata supplied at insert time plus the `user_id` key.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl SemanticIndexEntry {
    /// Content address for `text` stored under `user_id`.
    pub fn content_id(user_id: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(user_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifier of the matched entry.
    pub id: String,
    /// The matched text.
    pub content: String,
    /// Metadata of the matched entry.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Cosine similarity to the query (higher is better).
    pub score: f64,
}

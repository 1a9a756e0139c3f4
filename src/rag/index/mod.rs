//! Long-term semantic memory: a similarity index partitioned by user.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::rag::core::{cosine_similarity, EmbeddingFunctionTrait};
use crate::rag::embeddings::HashEmbedder;
use crate::rag::types::{SearchResult, SemanticIndexEntry};

/// Metadata key recording the owning partition.
pub const USER_ID_KEY: &str = "user_id";

/// Default number of results for [`SemanticIndex::search`].
pub const DEFAULT_N_RESULTS: usize = 3;

/// Content-addressed similarity store keyed by user.
///
/// Every operation is scoped to one partition; a search can only ever see
/// entries inserted under the same `user_id`. Absent partitions behave as
/// empty ones.
pub struct SemanticIndex {
    embedder: Arc<dyn EmbeddingFunctionTrait>,
    partitions: RwLock<HashMap<String, Vec<SemanticIndexEntry>>>,
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex")
            .field("partitions", &self.partitions.read().len())
            .finish_non_exhaustive()
    }
}

impl Default for SemanticIndex {
    fn default() -> Self {
        Self::new(Arc::new(HashEmbedder::default()))
    }
}

impl SemanticIndex {
    /// Create an empty index using `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingFunctionTrait>) -> Self {
        Self {
            embedder,
            partitions: RwLock::new(HashMap::new()),
        }
    }

    /// Embed `text` and store it in `user_id`'s partition.
    ///
    /// Identical text in the same partition maps to the same id and replaces
    /// the earlier entry. Returns the entry id.
    pub fn add(
        &self,
        user_id: &str,
        text: &str,
        metadata: Option<HashMap<String, Value>>,
    ) -> Result<String, anyhow::Error> {
        let embedding = self.embedder.embed_query(text)?;
        let mut metadata = metadata.unwrap_or_default();
        metadata.insert(USER_ID_KEY.to_string(), Value::String(user_id.to_string()));

        let entry = SemanticIndexEntry {
            id: SemanticIndexEntry::content_id(user_id, text),
            user_id: user_id.to_string(),
            text: text.to_string(),
            embedding,
            metadata,
        };
        let id = entry.id.clone();

        let mut partitions = self.partitions.write();
        let partition = partitions.entry(user_id.to_string()).or_default();
        match partition.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => *existing = entry,
            None => partition.push(entry),
        }
        log::debug!(
            "SemanticIndex add to partition '{}': {} entries",
            user_id,
            partition.len()
        );
        Ok(id)
    }

    /// The `n_results` entries of `user_id` most similar to `query`.
    ///
    /// Ranked by cosine similarity, descending; ties keep insertion order.
    pub fn search(
        &self,
        user_id: &str,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<SearchResult>, anyhow::Error> {
        if n_results == 0 {
            return Ok(Vec::new());
        }
        // Skip the embedding call for empty partitions.
        if self.count(user_id) == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_query(query)?;
        let partitions = self.partitions.read();
        let Some(partition) = partitions.get(user_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<SearchResult> = partition
            .iter()
            .map(|entry| SearchResult {
                id: entry.id.clone(),
                content: entry.text.clone(),
                metadata: entry.metadata.clone(),
                score: cosine_similarity(&query_embedding, &entry.embedding),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(n_results);
        Ok(scored)
    }

    /// Remove every entry of `user_id`.
    pub fn clear_user(&self, user_id: &str) {
        if self.partitions.write().remove(user_id).is_some() {
            log::info!("SemanticIndex cleared partition '{}'", user_id);
        }
    }

    /// Number of entries stored for `user_id`.
    pub fn count(&self, user_id: &str) -> usize {
        self.partitions.read().get(user_id).map_or(0, Vec::len)
    }
}

//! Core abstractions for the semantic index.

pub use crate::rag::types::{Embeddings, SearchResult, SemanticIndexEntry};

/// Result type for individual embedding operations.
pub type EmbeddingResult = Vec<f32>;

/// Trait for embedding functions.
///
/// Embedding functions convert input text into vector embeddings. They must
/// be deterministic for identical input within a process lifetime.
pub trait EmbeddingFunctionTrait: Send + Sync {
    /// Convert input texts to embeddings, one vector per input.
    fn call(&self, input: &[String]) -> Result<Embeddings, anyhow::Error>;

    /// Embed a single query (alias for `call` with a single input).
    fn embed_query(&self, input: &str) -> Result<EmbeddingResult, anyhow::Error> {
        let results = self.call(&[input.to_string()])?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Embedding function returned no results"))
    }
}

/// Cosine similarity of two vectors; `0.0` if either is zero or they differ
/// in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

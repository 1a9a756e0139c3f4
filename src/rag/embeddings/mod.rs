//! Embedding functions and the factory that builds them from a provider description.
//!
//! The crate ships one provider, `hash`: a deterministic feature-hashing
//! bag-of-words embedder. It needs no network and gives stable vectors for
//! identical input, which is what the index and the tests rely on. Remote
//! providers plug in by implementing [`EmbeddingFunctionTrait`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::rag::core::EmbeddingFunctionTrait;
use crate::rag::types::Embeddings;

/// Default vector width of [`HashEmbedder`].
pub const DEFAULT_DIMENSIONS: usize = 256;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").unwrap());

/// Known provider names accepted by [`build_embedder`].
pub const PROVIDERS: &[&str] = &["hash"];

/// Feature-hashing embedder.
///
/// Each lowercase alphanumeric token is hashed into one of `dimensions`
/// buckets with a hash-derived sign; the result is L2-normalized.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashEmbedder {
    /// Create an embedder producing `dimensions`-wide vectors (minimum 1).
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Output vector width.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in TOKEN_PATTERN.find_iter(&lowered) {
            let mut hasher = DefaultHasher::new();
            token.as_str().hash(&mut hasher);
            let hash = hasher.finish();
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl EmbeddingFunctionTrait for HashEmbedder {
    fn call(&self, input: &[String]) -> Result<Embeddings, anyhow::Error> {
        Ok(input.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// Build an embedding function from provider settings.
///
/// # Arguments
/// * `settings` - `{"provider": "hash", "config": {"dimensions": 128}}`; `config`
///   is optional.
///
/// # Errors
/// Returns an error if `provider` is missing or unknown.
pub fn build_embedder(settings: &Value) -> Result<Box<dyn EmbeddingFunctionTrait>, anyhow::Error> {
    let provider_name = settings
        .get("provider")
        .and_then(|p| p.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing 'provider' key in embedder settings"))?;

    match provider_name {
        "hash" => {
            let dimensions = settings
                .get("config")
                .and_then(|c| c.get("dimensions"))
                .and_then(Value::as_u64)
                .map(|d| d as usize)
                .unwrap_or(DEFAULT_DIMENSIONS);
            Ok(Box::new(HashEmbedder::new(dimensions)))
        }
        other => Err(anyhow::anyhow!(
            "Unknown provider: {}. Available providers: {:?}",
            other,
            PROVIDERS
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::core::cosine_similarity;

    #[test]
    fn test_hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed_query("User likes history and travel").unwrap();
        let b = embedder.embed_query("User likes history and travel").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_related_text_scores_higher() {
        let embedder = HashEmbedder::default();
        let doc = embedder.embed_query("User likes history, travel, and Italian culture.").unwrap();
        let close = embedder.embed_query("Italian history").unwrap();
        let far = embedder.embed_query("quantum chromodynamics lattice").unwrap();
        assert!(cosine_similarity(&doc, &close) > cosine_similarity(&doc, &far));
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let embedder = HashEmbedder::new(8);
        let v = embedder.embed_query("").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_build_embedder() {
        let embedder = build_embedder(&serde_json::json!({
            "provider": "hash",
            "config": {"dimensions": 32}
        }))
        .unwrap();
        assert_eq!(embedder.embed_query("hello").unwrap().len(), 32);

        assert!(build_embedder(&serde_json::json!({"provider": "openai"})).is_err());
        assert!(build_embedder(&serde_json::json!({})).is_err());
    }
}

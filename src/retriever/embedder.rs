//! Embedding provider contract and a deterministic reference implementation.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Produces vector embeddings for query and document text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, threaded into the chunk cache key.
    fn model_id(&self) -> &str;

    /// Embeds a single query string.
    async fn embed_query(&self, text: &str) -> Vec<f64>;

    /// Embeds a batch of chunk texts, preserving input order.
    async fn embed_texts(&self, texts: &[String]) -> Vec<Vec<f64>>;
}

/// Deterministic, low-fidelity embedder: hashes text into a fixed-width
/// vector. No real semantic content, but stable and collision-resistant
/// enough to exercise the fusion and late-chunking code paths without an
/// external model dependency.
pub struct DeterministicEmbedder {
    dim: usize,
    model_id: String,
}

impl DeterministicEmbedder {
    /// Builds an embedder with the given output dimensionality.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            model_id: "stub-embedder@v1".to_string(),
        }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f64> {
        let digest = Sha256::digest(text.as_bytes());
        (0..self.dim)
            .map(|i| f64::from(digest[i % digest.len()]) / 255.0)
            .collect()
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_query(&self, text: &str) -> Vec<f64> {
        self.hash_to_vector(text)
    }

    async fn embed_texts(&self, texts: &[String]) -> Vec<Vec<f64>> {
        texts.iter().map(|t| self.hash_to_vector(t)).collect()
    }
}

/// Cosine similarity between two vectors. Returns `0.0` if either vector
/// is empty or zero-norm.
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|y| y * y).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embedder_is_deterministic() {
        let embedder = DeterministicEmbedder::default();
        let a = embedder.embed_query("hello world").await;
        let b = embedder.embed_query("hello world").await;
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_cosine_similarity_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_empty_is_zero() {
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
    }
}

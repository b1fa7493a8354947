//! Feature-hashing embedder
//!
//! Deterministic, dependency-free vectors: terms are hashed into fixed buckets with
//! FNV-1a and weighted by term frequency, then L2-normalised. Good enough for lexical
//! similarity and for exercising the retrieval defenses without a model download.

use super::{EmbeddingError, EmbeddingProvider};
use ahash::{HashMap, HashMapExt};
use async_trait::async_trait;

pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(term: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % dims as u64) as usize
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.len() >= 2)
            .map(|s| s.to_lowercase())
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut tf: HashMap<String, f32> = HashMap::new();
        for token in Self::tokenize(text) {
            *tf.entry(token).or_insert(0.0) += 1.0;
        }

        let mut vec = vec![0.0f32; self.dimension];
        for (term, count) in &tf {
            // Longer terms carry more signal than short function words
            let weight = 1.0 + (term.len() as f32).ln();
            vec[Self::bucket(term, self.dimension)] += count * weight;
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }
        Ok(self.vectorize(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("quarterly budget report").await.unwrap();
        let b = embedder.embed("quarterly budget report").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_lexical_similarity() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("budget allocation for logistics").await.unwrap();
        let close = embedder
            .embed("The logistics budget allocation was approved.")
            .await
            .unwrap();
        let far = embedder.embed("Patient intake procedures changed.").await.unwrap();

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn test_empty_text() {
        let embedder = HashingEmbedder::default();
        assert!(embedder.embed("").await.is_err());
    }
}

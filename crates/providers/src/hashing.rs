//! Offline embedding backend based on feature hashing.
//!
//! Each lowercase word is hashed (FNV-1a) into one of `dimensions` buckets
//! with a hash-derived sign; the vector is L2-normalized. Texts sharing
//! vocabulary land close together under cosine similarity. No network, no
//! model weights, fully deterministic.

use async_trait::async_trait;
use llmbind_core::error::ProviderError;
use llmbind_core::provider::EmbeddingBackend;

pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed synchronously; `embed` just wraps this.
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = fnv1a(&word.to_lowercase());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl EmbeddingBackend for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.vectorize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.vectorize("Cancellation policy for rentals");
        let b = embedder.vectorize("Cancellation policy for rentals");
        assert_eq!(a, b);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn case_and_punctuation_insensitive() {
        let embedder = HashingEmbedder::new(64);
        assert_eq!(embedder.vectorize("Refund, policy!"), embedder.vectorize("refund policy"));
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::new(256);
        let query = embedder.vectorize("refund policy");
        let related = embedder.vectorize("our refund policy covers accidents");
        let unrelated = embedder.vectorize("the weather in lyon is sunny");
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashingEmbedder::new(8).vectorize("  ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn embed_matches_vectorize() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed("hello world").await.unwrap();
        assert_eq!(v.len(), 256);
        assert_eq!(v, embedder.vectorize("hello world"));
    }
}

//! Embedding providers: the [`EmbeddingProvider`] trait and a local hashing
//! implementation.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Ingestion and retrieval must share one provider: vectors from different
/// providers (or model versions) are not comparable.
///
/// # Example
///
/// ```rust,ignore
/// use codepal_rag::EmbeddingProvider;
///
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    ///
    /// Calls [`embed`](EmbeddingProvider::embed) once per input unless the
    /// backend overrides it with a native batch call.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// A deterministic, offline embedding provider based on feature hashing.
///
/// Text is lower-cased and split on non-alphanumeric characters; every token
/// increments one bucket chosen by an FNV-1a hash, and the vector is
/// L2-normalised. Texts sharing many tokens get a high cosine similarity,
/// texts sharing none score `0.0`. Useful for tests and for running without
/// an embedding service.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` buckets.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::embedding("Hash", "dimensions must be greater than zero"));
        }
        Ok(Self { dimensions })
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.dimensions as u64) as usize
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &str {
        "Hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            vector[self.bucket(token)] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

//! Embedding Gateway (C1)
//!
//! Deterministic `text -> vector[d]`, stable for identical input within a
//! model version. Side-effect free and idempotent. Never returns a zero or
//! random vector on failure — it fails with `MatchError::UpstreamUnavailable`
//! instead of silently substituting a default.

use crate::error::{MatchError, MatchResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Contract for the external embedding-serving collaborator (out of scope to
/// implement for real — this crate only defines the seam and a local
/// stand-in for it).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> MatchResult<Vec<f32>>;
    fn dimension(&self) -> usize;
}

/// Wraps an `EmbeddingProvider`, enforcing the dimension contract and the
/// "never substitute a default vector" failure rule. Callers are expected to
/// cache on `(content_hash, model_version)`.
pub struct EmbeddingGateway {
    provider: Box<dyn EmbeddingProvider>,
}

impl EmbeddingGateway {
    pub fn new(provider: Box<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub async fn embed(&self, text: &str) -> MatchResult<Vec<f32>> {
        let vec = self.provider.embed(text).await?;
        if vec.len() != self.provider.dimension() {
            return Err(MatchError::UpstreamUnavailable(format!(
                "embedding provider returned {} dims, expected {}",
                vec.len(),
                self.provider.dimension()
            )));
        }
        Ok(vec)
    }
}

/// Deterministic local stand-in for a real embedding model: a seeded
/// bag-of-words hash embedding. Same input bytes always produce the same
/// vector, with no network dependency — used for local runs and tests.
pub struct DeterministicEmbeddingProvider {
    dim: usize,
}

impl DeterministicEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl EmbeddingProvider for DeterministicEmbeddingProvider {
    async fn embed(&self, text: &str) -> MatchResult<Vec<f32>> {
        let mut vec = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let mut hasher = Sha256::new();
            hasher.update(token.to_lowercase().as_bytes());
            let digest = hasher.finalize();
            // Fold the 32-byte digest into `dim` buckets, accumulating a
            // signed contribution per bucket so repeated tokens reinforce.
            for (i, byte) in digest.iter().enumerate() {
                let bucket = (i + (*byte as usize)) % self.dim;
                let sign = if byte % 2 == 0 { 1.0 } else { -1.0 };
                vec[bucket] += sign * (*byte as f32 / 255.0);
            }
        }
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vec.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vec)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

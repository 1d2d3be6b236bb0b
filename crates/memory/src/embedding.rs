//! Embedders that turn chunk text into vectors.
//!
//! - [`HashingEmbedder`]: offline feature hashing over word tokens, no network
//! - [`ProviderEmbedder`]: delegates to a provider's embeddings endpoint

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use shiksha_core::error::StoreError;
use shiksha_core::provider::{EmbeddingRequest, Provider};
use shiksha_core::vector::Embedder;
use std::sync::Arc;
use tracing::debug;

/// Default dimensionality of hashed vectors.
pub const DEFAULT_HASHING_DIMS: usize = 256;

/// Feature-hashing embedder.
///
/// Each lower-cased word token is hashed with SHA-256; the first eight bytes
/// pick a bucket and the ninth a sign. The result is L2-normalised so cosine
/// similarity reduces to token overlap. Works for any script since tokens
/// are split on non-alphanumeric characters.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Embed one text synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let index = (u64::from_le_bytes(bucket) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
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
        Self::new(DEFAULT_HASHING_DIMS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Embedder backed by an LLM provider's embeddings endpoint.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = %self.provider.name(),
            model = %self.model,
            count = texts.len(),
            "Requesting embeddings"
        );

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| StoreError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != texts.len() {
            return Err(StoreError::EmbeddingFailed(format!(
                "expected {} embeddings, provider returned {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }
}

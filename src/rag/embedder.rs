use async_trait::async_trait;

use crate::errors::ApiError;

/// Seam to the embedding model backend.
///
/// Batch call shape; single-input callers pass a one-element slice, which is
/// what the per-chunk progress protocol does. No caching lives here — the
/// "already embedded" check is the store's existence lookup, made before
/// generation is invoked.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}

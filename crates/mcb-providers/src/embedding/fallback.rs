//! Local-then-remote embedding fallback.
//!
//! The local embedder is tried first; if it fails, the remote service is
//! tried next and its result (or error) is returned as-is. A remote failure
//! is never swallowed — only the local attempt is silently demoted.

use async_trait::async_trait;
use std::sync::Arc;

use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::{EmbeddingBatch, EmbeddingClient};

/// Wraps a local and a remote [`EmbeddingClient`], preferring local.
pub struct FallbackEmbeddingClient {
    local: Arc<dyn EmbeddingClient>,
    remote: Arc<dyn EmbeddingClient>,
}

impl FallbackEmbeddingClient {
    /// Pair a local embedder with a remote one. Refuses to pair embedders
    /// whose output dimensionality disagrees — the local fallback must never
    /// be used if its vectors wouldn't fit the vector store the remote one
    /// was sized for.
    pub fn new(local: Arc<dyn EmbeddingClient>, remote: Arc<dyn EmbeddingClient>) -> Result<Self> {
        if local.dim() != remote.dim() {
            return Err(Error::config(format!(
                "local embedder dim {} disagrees with remote embedder dim {}",
                local.dim(),
                remote.dim()
            )));
        }
        Ok(Self { local, remote })
    }
}

#[async_trait]
impl EmbeddingClient for FallbackEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self.local.embed(texts).await {
            Ok(vectors) => Ok(vectors),
            Err(local_err) => {
                tracing::warn!(error = %local_err, "local embedder failed, falling back to remote");
                self.remote.embed(texts).await
            }
        }
    }

    async fn infer(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        match self.local.infer(texts).await {
            Ok(batch) => Ok(batch),
            Err(local_err) => {
                tracing::warn!(error = %local_err, "local embedder failed, falling back to remote");
                self.remote.infer(texts).await
            }
        }
    }

    fn dim(&self) -> usize {
        self.remote.dim()
    }

    fn model_version(&self) -> &str {
        self.remote.model_version()
    }
}

//! Embedding Client Port
//!
//! Text-to-vector and text-to-NSFW-score inference. Implementations call a
//! remote embedding service over HTTP; an optional local in-process
//! embedder may be tried first as a fallback (never the reverse — a
//! remote failure must propagate, not be swallowed).

use crate::error::Result;
use async_trait::async_trait;
use shaku::Interface;

/// Output of a batch embedding call: one vector and one NSFW score per input.
#[derive(Debug, Clone)]
pub struct EmbeddingBatch {
    /// Embedding vectors, one per input text, all of [`EmbeddingClient::dim`] length.
    pub vectors: Vec<Vec<f32>>,
    /// NSFW classifier scores in `[0, 1]`, one per input text.
    pub nsfw_scores: Vec<f32>,
}

/// Text embedding and NSFW scoring.
#[async_trait]
pub trait EmbeddingClient: Interface + Send + Sync {
    /// Embed a batch of texts, without NSFW scoring.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a batch of texts and classify each for NSFW content in one call.
    async fn infer(&self, texts: &[String]) -> Result<EmbeddingBatch>;

    /// Dimensionality of vectors produced by this client.
    fn dim(&self) -> usize;

    /// Identifier of the embedding model version, surfaced on `/health` and
    /// stamped into every [`crate::value_objects::VectorPayload::embedding_version`].
    fn model_version(&self) -> &str;
}

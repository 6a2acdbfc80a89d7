//! Local in-process embedder (`local_embedder.enabled` config key).
//!
//! Uses the Actor pattern to serialize access to the underlying ONNX model
//! without locking: the model is loaded once and every `embed`/`infer` call
//! round-trips through a channel to the actor task.
//!
//! Has no NSFW classifier of its own; `infer` reports a zero score for every
//! text. Only [`FallbackEmbeddingClient`] should treat that as meaningful —
//! callers wanting real NSFW scores must use the remote client.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::{mpsc, oneshot};

use crate::constants::EMBEDDING_DIMENSION_FASTEMBED_DEFAULT;
use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::{EmbeddingBatch, EmbeddingClient};

enum FastEmbedMessage {
    Embed {
        texts: Vec<String>,
        tx: oneshot::Sender<Result<Vec<Vec<f32>>>>,
    },
}

/// Local embedder backed by `fastembed`'s ONNX runtime.
pub struct FastEmbedClient {
    sender: mpsc::Sender<FastEmbedMessage>,
    model_version: String,
    dim: usize,
}

impl FastEmbedClient {
    /// Load the default model (`AllMiniLML6V2`, 384-dim).
    pub fn new() -> Result<Self> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2, EMBEDDING_DIMENSION_FASTEMBED_DEFAULT)
    }

    /// Load a named model with its known output dimensionality.
    pub fn with_model(model: EmbeddingModel, dim: usize) -> Result<Self> {
        let model_version = format!("fastembed:{model:?}");
        let init_options = InitOptions::new(model);
        let text_embedding = TextEmbedding::try_new(init_options)
            .map_err(|e| Error::embedding(format!("failed to load local embedder: {e}")))?;

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(run_actor(rx, text_embedding));

        Ok(Self {
            sender: tx,
            model_version,
            dim,
        })
    }
}

async fn run_actor(mut receiver: mpsc::Receiver<FastEmbedMessage>, model: TextEmbedding) {
    while let Some(FastEmbedMessage::Embed { texts, tx }) = receiver.recv().await {
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let result = model
            .embed(text_refs, None)
            .map_err(|e| Error::embedding(format!("local embedding failed: {e}")));
        let _ = tx.send(result);
    }
}

#[async_trait]
impl EmbeddingClient for FastEmbedClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(FastEmbedMessage::Embed { texts: texts.to_vec(), tx })
            .await
            .map_err(|_| Error::embedding("local embedder actor channel closed"))?;
        rx.await
            .unwrap_or_else(|_| Err(Error::embedding("local embedder actor closed")))
    }

    async fn infer(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        let vectors = self.embed(texts).await?;
        let nsfw_scores = vec![0.0; vectors.len()];
        Ok(EmbeddingBatch { vectors, nsfw_scores })
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }
}

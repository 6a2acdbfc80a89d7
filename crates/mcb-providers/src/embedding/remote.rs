//! Remote embedding client backed by the GPU inference service.
//!
//! Thin JSON-over-HTTP client for a service exposing `POST {base}/embed`
//! (`{texts}` -> `{embeddings}`) and `POST {base}/infer` (`{texts}` ->
//! `{embeddings, nsfw_scores}`). Bounded retry on transient upstream
//! statuses; any other failure is returned as-is (never swallowed).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::{EmbeddingBatch, EmbeddingClient};

use crate::http::HttpClientConfig;
use crate::retry::with_bounded_retry;

#[derive(Serialize)]
struct InferRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct InferResponse {
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    nsfw_scores: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding client for the GPU inference sidecar (`gpu_endpoint` config key).
pub struct GpuEmbeddingClient {
    base_url: String,
    model_version: String,
    dim: usize,
    http: reqwest::Client,
}

impl GpuEmbeddingClient {
    /// Connect to a GPU inference service. `dim` is the expected embedding
    /// width, used by callers to validate against the vector store; it is
    /// not verified against the service's actual output here.
    pub fn new(base_url: impl Into<String>, model_version: impl Into<String>, dim: usize) -> Self {
        Self::with_timeout(base_url, model_version, dim, HttpClientConfig::default().timeout)
    }

    /// Connect with an explicit request timeout (e.g. `gpu_endpoint` config's
    /// `timeout_seconds`).
    pub fn with_timeout(
        base_url: impl Into<String>,
        model_version: impl Into<String>,
        dim: usize,
        timeout: std::time::Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model_version: model_version.into(),
            dim,
            http,
        }
    }

    async fn post_json<Req: Serialize + Sync, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        with_bounded_retry(|| async {
            let response = self
                .http
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| (None, Error::embedding(format!("request to {url} failed: {e}"))))?;

            let status = response.status();
            if !status.is_success() {
                let code = status.as_u16();
                return Err((
                    Some(code),
                    Error::embedding(format!("{url} returned {code}")),
                ));
            }
            response
                .json::<Resp>()
                .await
                .map_err(|e| (None, Error::embedding(format!("decoding response from {url}: {e}"))))
        })
        .await
    }
}

#[async_trait]
impl EmbeddingClient for GpuEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let resp: EmbedResponse = self.post_json("/embed", &InferRequest { texts }).await?;
        Ok(resp.embeddings)
    }

    async fn infer(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        let resp: InferResponse = self.post_json("/infer", &InferRequest { texts }).await?;
        let nsfw_scores = if resp.nsfw_scores.len() == resp.embeddings.len() {
            resp.nsfw_scores
        } else {
            vec![0.0; resp.embeddings.len()]
        };
        Ok(EmbeddingBatch {
            vectors: resp.embeddings,
            nsfw_scores,
        })
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }
}

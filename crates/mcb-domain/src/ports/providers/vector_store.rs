//! Vector Store Port
//!
//! Defines the contract every vector-store backend must satisfy: upsert by
//! stable record identity, filtered top-k similarity search, and a
//! best-effort size count. Implementations live in `mcb-providers` (local
//! HNSW, and two remote cluster-backed alternatives); callers never see
//! backend-specific types.

use crate::error::Result;
use crate::value_objects::{MetadataFilter, RecordId, ScoredHit, VectorPayload};
use async_trait::async_trait;
use shaku::Interface;

/// Vector similarity metric used to score a query against stored vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Cosine similarity; score = 1 - distance.
    #[default]
    Cosine,
    /// Euclidean distance; score = -distance.
    Euclidean,
    /// Raw dot product; score = dot.
    Dot,
}

/// Vector storage and similarity search.
///
/// # Example
///
/// ```ignore
/// use mcb_domain::ports::providers::VectorStore;
///
/// let ids = store.add(&vectors, &payloads).await?;
/// let hits = store.query(&query_vector, 20, &filter, 0).await?;
/// ```
#[async_trait]
pub trait VectorStore: Interface + Send + Sync {
    /// Upsert vectors keyed by each payload's `(source, pg_id)` identity.
    ///
    /// A prior vector for the same key is logically replaced; the returned
    /// ids are stable across re-insertions of the same key.
    async fn add(
        &self,
        vectors: &[Vec<f32>],
        payloads: &[VectorPayload],
    ) -> Result<Vec<RecordId>>;

    /// Top-k similarity search with an optional conjunctive metadata filter.
    ///
    /// `offset` skips the first `offset` matching hits after filtering and
    /// scoring; backends may over-fetch internally to satisfy this under a
    /// restrictive filter.
    async fn query(
        &self,
        vector: &[f32],
        topk: usize,
        filter: &MetadataFilter,
        offset: usize,
    ) -> Result<Vec<ScoredHit>>;

    /// Best-effort count of live points/vectors.
    async fn size(&self) -> Result<usize>;

    /// Expected embedding dimensionality for this collection.
    fn dim(&self) -> usize;

    /// Identifier for this backend (e.g. "local", "cluster_a", "cluster_b").
    fn provider_name(&self) -> &str;
}

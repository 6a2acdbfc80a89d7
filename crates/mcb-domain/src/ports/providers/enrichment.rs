//! Enrichment Store Port
//!
//! Persists third-party metadata (TMDB, TPDB) fetched for a catalog
//! reference, with TTL-driven staleness so the orchestrator doesn't
//! re-probe the same reference on every sync cycle.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use shaku::Interface;

/// Outcome of the last enrichment attempt for a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentStatus {
    /// The upstream API returned usable data.
    Ok,
    /// The upstream API reported the reference does not exist.
    NotFound,
    /// The attempt failed (network, parse, rate-limit); eligible for retry sooner than `NotFound`.
    Error,
}

/// A cached enrichment record.
#[derive(Debug, Clone)]
pub struct EnrichmentRecord {
    /// Outcome of the last attempt.
    pub status: EnrichmentStatus,
    /// Normalized fields (genres, keywords, aka, overview, ratings, ...).
    pub fields: Value,
    /// Raw upstream response, kept for debugging/detail endpoints.
    pub raw: Value,
    /// Error message, when `status == Error`.
    pub message: Option<String>,
}

/// Persists and retrieves enrichment records for TMDB/TPDB references.
#[async_trait]
pub trait EnrichmentStore: Interface + Send + Sync {
    /// Look up a cached record, honoring the success/not-found TTLs; returns
    /// `None` when no record exists or it is stale.
    async fn get(&self, schema: &str, reference: &str) -> Result<Option<EnrichmentRecord>>;

    /// Upsert a record after a live enrichment attempt.
    async fn put(&self, schema: &str, reference: &str, record: EnrichmentRecord) -> Result<()>;
}

/// A single upstream reference to resolve: `(content_type, id)` for TMDB,
/// `(content_type, content_source, content_id)` for TPDB — callers encode
/// whatever shape their `reference` key needs.
#[derive(Debug, Clone)]
pub struct EnrichmentQuery {
    /// Opaque reference key, source-specific (e.g. `"movie:603"`).
    pub reference: String,
    /// Free-form query parameters passed to the upstream client (ids, titles, ...).
    pub params: serde_json::Value,
}

/// Live upstream enrichment client (TMDB or TPDB). Implementations live in
/// `mcb-providers`; the orchestrator never talks HTTP directly.
#[async_trait]
pub trait EnrichmentClient: Interface + Send + Sync {
    /// Resolve a single reference against the upstream API.
    async fn fetch(&self, query: &EnrichmentQuery) -> Result<EnrichmentRecord>;

    /// Identifier for logging (`"tmdb"`, `"tpdb"`).
    fn name(&self) -> &str;
}

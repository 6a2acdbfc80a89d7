//! Catalog Reader Port
//!
//! Reads from the relational catalog that backs a configured source:
//! pending-row scans for the sync pipeline, batched hydration for search,
//! keyword search, and the auxiliary lookups behind `/torrent_files`,
//! `/tmdb_latest`, `/tmdb_detail`, and the TMDB-derived query expansion
//! tokens used by the query rewriter.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use shaku::Interface;
use std::collections::HashMap;

/// A single pending row surfaced by [`CatalogReader::fetch_pending`].
#[derive(Debug, Clone)]
pub struct PendingRow {
    /// Catalog primary key rendered as text.
    pub pg_id: String,
    /// Raw indexable text (already concatenated per source configuration).
    pub text: String,
    /// md5 hex digest of `text`, computed by the catalog reader.
    pub text_hash: String,
    /// Source `updated_at` column value, when configured.
    pub updated_at: Option<DateTime<Utc>>,
    /// Additional source-specific columns (tmdb_id, genre, size, extension, ...).
    pub extra: HashMap<String, Value>,
}

/// A row returned by [`CatalogReader::fetch_by_ids`], keyed by `pg_id`.
#[derive(Debug, Clone)]
pub struct HydratedRow {
    /// Catalog primary key rendered as text.
    pub pg_id: String,
    /// Display title.
    pub title: String,
    /// All hydrated columns, including joined/aggregated side-table data.
    pub fields: HashMap<String, Value>,
}

/// A single file entry under `/torrent_files`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TorrentFile {
    /// Index of the file within the torrent.
    pub index: i64,
    /// Relative path of the file.
    pub path: String,
    /// Lowercased extension without the leading dot.
    pub extension: String,
    /// File size in bytes, when known.
    pub size: Option<i64>,
    /// Last-updated timestamp, when known.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A catalog-derived query expansion token with a relative weight.
#[derive(Debug, Clone)]
pub struct ExpansionToken {
    /// The token text.
    pub token: String,
    /// Relative weight (aka tokens outweigh keyword tokens); drives duplication count.
    pub weight: u8,
}

/// Reads from the relational catalog behind a configured source.
#[async_trait]
pub trait CatalogReader: Interface + Send + Sync {
    /// Ensure the sync-state table (and supporting index) exists.
    async fn ensure_tables(&self, source: &str) -> Result<()>;

    /// Fetch the next batch of pending rows for `source`.
    async fn fetch_pending(&self, source: &str, batch_size: usize) -> Result<Vec<PendingRow>>;

    /// Persist the sync-state for a batch of successfully embedded rows.
    async fn upsert_sync_state(
        &self,
        source: &str,
        rows: &[(String, String, String, f32)], // (pg_id, text_hash, embedding_version, nsfw_score)
    ) -> Result<()>;

    /// Record a failure against every row in a batch (truncated to 512 chars).
    async fn mark_failure(&self, source: &str, pg_ids: &[String], error: &str) -> Result<()>;

    /// Batched hydrate-by-id for search result reconstruction and post-enrichment refresh.
    async fn fetch_by_ids(&self, source: &str, pg_ids: &[String]) -> Result<Vec<HydratedRow>>;

    /// Server-side `ILIKE` keyword search across a source's configured keyword fields.
    async fn search_by_keyword(
        &self,
        source: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<HydratedRow>>;

    /// File listing for a single torrent identified by its info-hash.
    async fn fetch_torrent_files(
        &self,
        schema: &str,
        info_hash: &str,
        limit: usize,
    ) -> Result<Vec<TorrentFile>>;

    /// Scan enrichment `aka`/`keywords` columns for tokens related to `query`,
    /// weighting `aka` tokens above `keywords` tokens.
    async fn search_tmdb_expansions(
        &self,
        schema: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ExpansionToken>>;

    /// Most recently enriched TMDB records.
    async fn fetch_latest_tmdb(&self, schema: &str, limit: usize) -> Result<Vec<HydratedRow>>;

    /// A single TMDB enrichment record by id and content type.
    async fn fetch_tmdb_detail(
        &self,
        schema: &str,
        tmdb_id: i64,
        content_type: &str,
    ) -> Result<Option<HydratedRow>>;

    /// Sync-state counters for `/sync_status`: `(synced, failed, last_synced_at)`.
    async fn sync_counts(&self, source: &str) -> Result<(u64, u64, Option<DateTime<Utc>>)>;
}

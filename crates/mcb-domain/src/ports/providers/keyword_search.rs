//! Keyword Search Port
//!
//! Server-side keyword search alternative to SQL `ILIKE`: a GraphQL backend
//! (e.g. bitmagnet) queried with variant-schema probing, so upstream schema
//! drift doesn't take the keyword path down entirely.

use crate::error::Result;
use async_trait::async_trait;
use shaku::Interface;

/// A single keyword-search hit before scoring.
#[derive(Debug, Clone)]
pub struct KeywordHit {
    /// Source tag the record came from.
    pub source: String,
    /// Catalog primary key as text.
    pub pg_id: String,
    /// Display title, used to compute the keyword score.
    pub title: String,
    /// Free-form hydrated fields.
    pub fields: serde_json::Value,
}

/// Server-side keyword search across one or more sources.
#[async_trait]
pub trait KeywordSearch: Interface + Send + Sync {
    /// Run a keyword query, trying alternative query shapes in order until
    /// one succeeds against the upstream schema.
    async fn search(
        &self,
        query: &str,
        sources: &[String],
        limit: usize,
    ) -> Result<Vec<KeywordHit>>;
}

//! Two-tier TTL cache for enrichment records.
//!
//! Successful lookups and not-found/error outcomes are held in separate
//! Moka caches with independent TTLs, mirroring the original sync worker's
//! `cache_ttl_hours` / `not_found_ttl_hours` split: a confirmed miss is
//! worth remembering far longer than a confirmed hit, so repeated sync
//! cycles don't hammer an upstream API for references it has already told
//! us don't exist.

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use mcb_domain::error::Result;
use mcb_domain::ports::providers::enrichment::{EnrichmentRecord, EnrichmentStatus, EnrichmentStore};

fn cache_key(schema: &str, reference: &str) -> String {
    format!("{schema}:{reference}")
}

/// Moka-backed [`EnrichmentStore`] with separate TTLs for hits vs. misses.
pub struct MokaEnrichmentStore {
    hits: Cache<String, EnrichmentRecord>,
    misses: Cache<String, EnrichmentRecord>,
}

impl MokaEnrichmentStore {
    /// `hit_ttl` bounds how long a successful enrichment is trusted before
    /// it is re-fetched; `miss_ttl` bounds `NotFound`/`Error` outcomes and
    /// is typically much longer.
    pub fn new(hit_ttl: Duration, miss_ttl: Duration) -> Self {
        Self {
            hits: Cache::builder().time_to_live(hit_ttl).build(),
            misses: Cache::builder().time_to_live(miss_ttl).build(),
        }
    }
}

#[async_trait]
impl EnrichmentStore for MokaEnrichmentStore {
    async fn get(&self, schema: &str, reference: &str) -> Result<Option<EnrichmentRecord>> {
        let key = cache_key(schema, reference);
        if let Some(record) = self.hits.get(&key).await {
            return Ok(Some(record));
        }
        Ok(self.misses.get(&key).await)
    }

    async fn put(&self, schema: &str, reference: &str, record: EnrichmentRecord) -> Result<()> {
        let key = cache_key(schema, reference);
        match record.status {
            EnrichmentStatus::Ok => self.hits.insert(key, record).await,
            EnrichmentStatus::NotFound | EnrichmentStatus::Error => self.misses.insert(key, record).await,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(status: EnrichmentStatus) -> EnrichmentRecord {
        EnrichmentRecord { status, fields: json!({}), raw: json!({}), message: None }
    }

    #[tokio::test]
    async fn ok_and_not_found_land_in_separate_tiers() {
        let store = MokaEnrichmentStore::new(Duration::from_secs(60), Duration::from_secs(120));
        store.put("hermes", "movie:1", record(EnrichmentStatus::Ok)).await.unwrap();
        store.put("hermes", "movie:2", record(EnrichmentStatus::NotFound)).await.unwrap();

        let hit = store.get("hermes", "movie:1").await.unwrap().unwrap();
        assert_eq!(hit.status, EnrichmentStatus::Ok);
        let miss = store.get("hermes", "movie:2").await.unwrap().unwrap();
        assert_eq!(miss.status, EnrichmentStatus::NotFound);
        assert!(store.get("hermes", "movie:3").await.unwrap().is_none());
    }
}

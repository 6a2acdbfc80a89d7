//! Moka in-memory cache provider.
//!
//! Backs the TMDB/TPDB enrichment cache and any other JSON-keyed caching the
//! sync pipeline needs. Single-process, high-performance, no persistence.

use crate::constants::CACHE_DEFAULT_SIZE_LIMIT;
use async_trait::async_trait;
use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::{CacheEntryConfig, CacheProvider, CacheProviderFactoryInterface, CacheStats};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Moka-based in-memory cache provider.
#[derive(Clone)]
pub struct MokaCacheProvider {
    cache: Cache<String, Vec<u8>>,
    max_size: usize,
}

impl Default for MokaCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MokaCacheProvider {
    /// Create a new Moka cache provider with default settings.
    pub fn new() -> Self {
        Self::with_capacity(CACHE_DEFAULT_SIZE_LIMIT)
    }

    /// Create a new Moka cache provider with specified capacity.
    pub fn with_capacity(max_size: usize) -> Self {
        let cache = Cache::builder().max_capacity(max_size as u64).build();
        Self { cache, max_size }
    }

    /// Create a new Moka cache provider with custom capacity and default TTL.
    pub fn with_config(max_size: usize, time_to_live: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_size as u64)
            .time_to_live(time_to_live)
            .build();
        Self { cache, max_size }
    }

    /// Maximum capacity of the cache.
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[async_trait]
impl CacheProvider for MokaCacheProvider {
    async fn get_json(&self, key: &str) -> Result<Option<String>> {
        if let Some(bytes) = self.cache.get(key).await {
            let json = String::from_utf8(bytes)
                .map_err(|e| Error::cache(format!("invalid utf-8 in cached value: {e}")))?;
            Ok(Some(json))
        } else {
            Ok(None)
        }
    }

    async fn set_json(&self, key: &str, value: &str, _config: CacheEntryConfig) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > self.max_size {
            return Err(Error::cache(format!(
                "cache value size {} exceeds maximum size {}",
                bytes.len(),
                self.max_size
            )));
        }
        self.cache.insert(key.to_string(), bytes.to_vec()).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let existed = self.cache.contains_key(key);
        self.cache.invalidate(key).await;
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        self.cache.run_pending_tasks().await;
        Ok(CacheStats {
            hits: 0,
            misses: 0,
            entries: self.cache.entry_count(),
            hit_rate: 0.0,
            bytes_used: 0,
        })
    }

    async fn size(&self) -> Result<usize> {
        self.cache.run_pending_tasks().await;
        Ok(self.cache.entry_count() as usize)
    }

    fn provider_name(&self) -> &str {
        "moka"
    }
}

impl std::fmt::Debug for MokaCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheProvider")
            .field("max_size", &self.max_size)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

/// Factory that builds [`MokaCacheProvider`] instances for DI wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct MokaCacheProviderFactory;

#[async_trait]
impl CacheProviderFactoryInterface for MokaCacheProviderFactory {
    async fn create(&self, max_capacity: u64, default_ttl: Duration) -> Result<Arc<dyn CacheProvider>> {
        Ok(Arc::new(MokaCacheProvider::with_config(max_capacity as usize, default_ttl)))
    }

    fn create_null(&self) -> Arc<dyn CacheProvider> {
        Arc::new(MokaCacheProvider::with_capacity(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = MokaCacheProvider::new();
        cache.set_json("key", "\"value\"", CacheEntryConfig::default()).await.unwrap();
        assert_eq!(cache.get_json("key").await.unwrap(), Some("\"value\"".to_string()));
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let cache = MokaCacheProvider::new();
        assert_eq!(cache.get_json("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_reports_prior_existence() {
        let cache = MokaCacheProvider::new();
        cache.set_json("key", "1", CacheEntryConfig::default()).await.unwrap();
        assert!(cache.delete("key").await.unwrap());
        assert!(!cache.delete("key").await.unwrap());
    }

    #[tokio::test]
    async fn oversized_value_is_rejected() {
        let cache = MokaCacheProvider::with_capacity(4);
        let big = "x".repeat(16);
        assert!(cache.set_json("key", &big, CacheEntryConfig::default()).await.is_err());
    }
}

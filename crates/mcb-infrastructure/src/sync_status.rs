//! Periodically refreshed sync-status snapshot cache.
//!
//! `/sync_status` reads a cached [`SyncStatusSnapshot`] rather than hitting
//! the catalog per request. A background task calls [`refresh`] on a fixed
//! interval under a write lock; handlers call [`current`] under a read lock.

use async_trait::async_trait;
use mcb_domain::error::Result;
use mcb_domain::ports::infrastructure::sync_status::{
    SourceSyncStatus, SyncStatusProvider, SyncStatusSnapshot,
};
use mcb_domain::ports::providers::CatalogReader;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// [`SyncStatusProvider`] backed by [`CatalogReader::sync_counts`].
pub struct CatalogSyncStatusProvider {
    catalog: Arc<dyn CatalogReader>,
    sources: Vec<String>,
    snapshot: RwLock<SyncStatusSnapshot>,
}

impl CatalogSyncStatusProvider {
    /// Build a provider over the given source names. The snapshot starts
    /// empty; call [`refresh`](Self::refresh) before serving traffic.
    pub fn new(catalog: Arc<dyn CatalogReader>, sources: Vec<String>) -> Self {
        Self {
            catalog,
            sources,
            snapshot: RwLock::new(SyncStatusSnapshot::default()),
        }
    }

    /// Spawn a background task that calls [`refresh`](Self::refresh) on a
    /// fixed interval, logging and continuing on failure.
    pub fn spawn_refresher(self: &Arc<Self>, interval: std::time::Duration) {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = provider.refresh().await {
                    warn!(error = %e, "sync-status refresh failed");
                }
            }
        });
    }
}

#[async_trait]
impl SyncStatusProvider for CatalogSyncStatusProvider {
    async fn current(&self) -> SyncStatusSnapshot {
        self.snapshot.read().await.clone()
    }

    async fn refresh(&self) -> Result<()> {
        let mut sources = std::collections::HashMap::with_capacity(self.sources.len());
        for name in &self.sources {
            let (synced, failed, last_synced_at) = self.catalog.sync_counts(name).await?;
            sources.insert(
                name.clone(),
                SourceSyncStatus {
                    synced,
                    failed,
                    last_synced_at,
                },
            );
        }
        let snapshot = SyncStatusSnapshot {
            sources,
            computed_at: Some(chrono::Utc::now()),
        };
        *self.snapshot.write().await = snapshot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait as at;
    use chrono::{DateTime, Utc};
    use mcb_domain::error::Result as DomainResult;
    use mcb_domain::ports::providers::catalog::{ExpansionToken, HydratedRow, PendingRow, TorrentFile};

    struct StubCatalog {
        synced: u64,
        failed: u64,
    }

    #[at]
    impl CatalogReader for StubCatalog {
        async fn ensure_tables(&self, _source: &str) -> DomainResult<()> {
            Ok(())
        }
        async fn fetch_pending(&self, _source: &str, _batch_size: usize) -> DomainResult<Vec<PendingRow>> {
            Ok(Vec::new())
        }
        async fn upsert_sync_state(
            &self,
            _source: &str,
            _rows: &[(String, String, String, f32)],
        ) -> DomainResult<()> {
            Ok(())
        }
        async fn mark_failure(&self, _source: &str, _pg_ids: &[String], _error: &str) -> DomainResult<()> {
            Ok(())
        }
        async fn fetch_by_ids(&self, _source: &str, _pg_ids: &[String]) -> DomainResult<Vec<HydratedRow>> {
            Ok(Vec::new())
        }
        async fn search_by_keyword(
            &self,
            _source: &str,
            _query: &str,
            _limit: usize,
        ) -> DomainResult<Vec<HydratedRow>> {
            Ok(Vec::new())
        }
        async fn fetch_torrent_files(
            &self,
            _schema: &str,
            _info_hash: &str,
            _limit: usize,
        ) -> DomainResult<Vec<TorrentFile>> {
            Ok(Vec::new())
        }
        async fn search_tmdb_expansions(
            &self,
            _schema: &str,
            _query: &str,
            _limit: usize,
        ) -> DomainResult<Vec<ExpansionToken>> {
            Ok(Vec::new())
        }
        async fn fetch_latest_tmdb(&self, _schema: &str, _limit: usize) -> DomainResult<Vec<HydratedRow>> {
            Ok(Vec::new())
        }
        async fn fetch_tmdb_detail(
            &self,
            _schema: &str,
            _tmdb_id: i64,
            _content_type: &str,
        ) -> DomainResult<Option<HydratedRow>> {
            Ok(None)
        }
        async fn sync_counts(&self, _source: &str) -> DomainResult<(u64, u64, Option<DateTime<Utc>>)> {
            Ok((self.synced, self.failed, Some(Utc::now())))
        }
    }

    #[tokio::test]
    async fn refresh_populates_snapshot() {
        let catalog: Arc<dyn CatalogReader> = Arc::new(StubCatalog { synced: 10, failed: 2 });
        let provider = CatalogSyncStatusProvider::new(catalog, vec!["movies".to_string()]);
        assert!(provider.current().await.sources.is_empty());

        provider.refresh().await.unwrap();
        let snapshot = provider.current().await;
        let status = snapshot.sources.get("movies").unwrap();
        assert_eq!(status.synced, 10);
        assert_eq!(status.failed, 2);
        assert!(snapshot.computed_at.is_some());
    }
}

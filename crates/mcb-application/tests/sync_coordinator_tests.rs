//! Integration tests for the sync coordinator's fetch -> embed -> upsert
//! cycle, exercised against hand-written fakes.

use async_trait::async_trait;
use chrono::Utc;
use mcb_application::domain_services::sync_coordinator::{SourceSyncConfig, SyncCoordinator};
use mcb_domain::error::Result;
use mcb_domain::ports::providers::{
    CatalogReader, EmbeddingBatch, EmbeddingClient, ExpansionToken, HydratedRow, PendingRow,
    TorrentFile, VectorStore,
};
use mcb_domain::value_objects::{RecordId, ScoredHit, VectorPayload};
use mcb_domain::value_objects::MetadataFilter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct FakeEmbedder;

#[async_trait]
impl EmbeddingClient for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect())
    }

    async fn infer(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        Ok(EmbeddingBatch {
            vectors: texts.iter().map(|_| vec![0.5, 0.5]).collect(),
            nsfw_scores: texts.iter().map(|_| 0.0).collect(),
        })
    }

    fn dim(&self) -> usize {
        2
    }

    fn model_version(&self) -> &str {
        "fake-embedder-v1"
    }
}

#[derive(Default)]
struct RecordingVectorStore {
    added: Mutex<Vec<VectorPayload>>,
}

#[async_trait]
impl VectorStore for RecordingVectorStore {
    async fn add(&self, _vectors: &[Vec<f32>], payloads: &[VectorPayload]) -> Result<Vec<RecordId>> {
        let mut added = self.added.lock().unwrap();
        let ids = payloads.iter().map(|p| p.id.clone()).collect();
        added.extend(payloads.iter().cloned());
        Ok(ids)
    }

    async fn query(
        &self,
        _vector: &[f32],
        _topk: usize,
        _filter: &MetadataFilter,
        _offset: usize,
    ) -> Result<Vec<ScoredHit>> {
        Ok(Vec::new())
    }

    async fn size(&self) -> Result<usize> {
        Ok(self.added.lock().unwrap().len())
    }

    fn dim(&self) -> usize {
        2
    }

    fn provider_name(&self) -> &str {
        "recording"
    }
}

/// Serves exactly one batch of pending rows, then an empty batch forever.
struct OneBatchCatalog {
    rows: Mutex<Option<Vec<PendingRow>>>,
    upserted: Mutex<Vec<String>>,
}

#[async_trait]
impl CatalogReader for OneBatchCatalog {
    async fn ensure_tables(&self, _source: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_pending(&self, _source: &str, _batch_size: usize) -> Result<Vec<PendingRow>> {
        Ok(self.rows.lock().unwrap().take().unwrap_or_default())
    }

    async fn upsert_sync_state(
        &self,
        _source: &str,
        rows: &[(String, String, String, f32)],
    ) -> Result<()> {
        self.upserted
            .lock()
            .unwrap()
            .extend(rows.iter().map(|r| r.0.clone()));
        Ok(())
    }

    async fn mark_failure(&self, _source: &str, _pg_ids: &[String], _error: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_by_ids(&self, _source: &str, _pg_ids: &[String]) -> Result<Vec<HydratedRow>> {
        Ok(Vec::new())
    }

    async fn search_by_keyword(
        &self,
        _source: &str,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<HydratedRow>> {
        Ok(Vec::new())
    }

    async fn fetch_torrent_files(
        &self,
        _schema: &str,
        _info_hash: &str,
        _limit: usize,
    ) -> Result<Vec<TorrentFile>> {
        Ok(Vec::new())
    }

    async fn search_tmdb_expansions(
        &self,
        _schema: &str,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<ExpansionToken>> {
        Ok(Vec::new())
    }

    async fn fetch_latest_tmdb(&self, _schema: &str, _limit: usize) -> Result<Vec<HydratedRow>> {
        Ok(Vec::new())
    }

    async fn fetch_tmdb_detail(
        &self,
        _schema: &str,
        _tmdb_id: i64,
        _content_type: &str,
    ) -> Result<Option<HydratedRow>> {
        Ok(None)
    }
}

fn row(pg_id: &str, text: &str) -> PendingRow {
    PendingRow {
        pg_id: pg_id.to_string(),
        text: text.to_string(),
        text_hash: format!("{:x}", md5::compute(text)),
        updated_at: Some(Utc::now()),
        extra: HashMap::new(),
    }
}

#[tokio::test]
async fn sync_source_embeds_and_commits_a_single_batch() {
    let catalog = Arc::new(OneBatchCatalog {
        rows: Mutex::new(Some(vec![row("1", "Alien 1979"), row("2", "Aliens 1986")])),
        upserted: Mutex::new(Vec::new()),
    });
    let vector_store = Arc::new(RecordingVectorStore::default());

    let coordinator = SyncCoordinator::new(
        catalog.clone(),
        Arc::new(FakeEmbedder),
        vector_store.clone(),
        None,
        None,
    );

    let cfg = SourceSyncConfig {
        name: "movies".to_string(),
        batch_size: 10,
        concurrency: 2,
        nsfw_threshold: 0.7,
        enrichment: None,
    };

    let summary = coordinator.sync_source(&cfg).await.unwrap();
    assert_eq!(summary.rows_embedded, 2);
    assert_eq!(summary.rows_failed, 0);
    assert_eq!(vector_store.added.lock().unwrap().len(), 2);
    assert_eq!(catalog.upserted.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn sync_source_rejects_dimension_mismatch_before_touching_the_catalog() {
    struct MismatchedVectorStore;

    #[async_trait]
    impl VectorStore for MismatchedVectorStore {
        async fn add(&self, _v: &[Vec<f32>], _p: &[VectorPayload]) -> Result<Vec<RecordId>> {
            Ok(Vec::new())
        }
        async fn query(
            &self,
            _vector: &[f32],
            _topk: usize,
            _filter: &MetadataFilter,
            _offset: usize,
        ) -> Result<Vec<ScoredHit>> {
            Ok(Vec::new())
        }
        async fn size(&self) -> Result<usize> {
            Ok(0)
        }
        fn dim(&self) -> usize {
            999
        }
        fn provider_name(&self) -> &str {
            "mismatched"
        }
    }

    let catalog = Arc::new(OneBatchCatalog {
        rows: Mutex::new(Some(vec![row("1", "Alien")])),
        upserted: Mutex::new(Vec::new()),
    });
    let coordinator = SyncCoordinator::new(
        catalog,
        Arc::new(FakeEmbedder),
        Arc::new(MismatchedVectorStore),
        None,
        None,
    );
    let cfg = SourceSyncConfig {
        name: "movies".to_string(),
        batch_size: 10,
        concurrency: 1,
        nsfw_threshold: 0.7,
        enrichment: None,
    };

    assert!(coordinator.sync_source(&cfg).await.is_err());
}

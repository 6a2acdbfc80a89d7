//! Integration tests for the search service pipeline, exercised against
//! hand-written fakes for the catalog, embedder, and vector store ports.

use async_trait::async_trait;
use mcb_domain::error::Result;
use mcb_domain::ports::providers::{
    CatalogReader, EmbeddingBatch, EmbeddingClient, ExpansionToken, HydratedRow, PendingRow,
    TorrentFile, VectorStore,
};
use mcb_domain::value_objects::{FileType, MetadataFilter, RecordId, ScoredHit, SizeSort, VectorPayload};
use mcb_application::domain_services::search_service::{SearchQuery, SearchService, SourceSearchConfig};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

struct FakeEmbedder;

#[async_trait]
impl EmbeddingClient for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }

    async fn infer(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        Ok(EmbeddingBatch {
            vectors: texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect(),
            nsfw_scores: texts.iter().map(|_| 0.0).collect(),
        })
    }

    fn dim(&self) -> usize {
        3
    }

    fn model_version(&self) -> &str {
        "fake-embedder-v1"
    }
}

fn payload(source: &str, pg_id: &str, title: &str, nsfw: bool) -> VectorPayload {
    VectorPayload {
        id: RecordId::new(source, pg_id),
        text_hash: format!("hash-{pg_id}"),
        embedding_version: "fake-embedder-v1".to_string(),
        nsfw,
        nsfw_score: if nsfw { 0.9 } else { 0.0 },
        has_tmdb: true,
        tmdb_id: Some(1),
        has_tpdb: false,
        tpdb_id: None,
        genre_tags: BTreeSet::new(),
        file_type: FileType::Video,
        audio_langs: BTreeSet::new(),
        subtitle_langs: BTreeSet::new(),
        size: None,
        title: title.to_string(),
    }
}

struct FakeVectorStore {
    hits: Vec<ScoredHit>,
}

#[async_trait]
impl VectorStore for FakeVectorStore {
    async fn add(&self, _vectors: &[Vec<f32>], _payloads: &[VectorPayload]) -> Result<Vec<RecordId>> {
        Ok(Vec::new())
    }

    async fn query(
        &self,
        _vector: &[f32],
        topk: usize,
        filter: &MetadataFilter,
        offset: usize,
    ) -> Result<Vec<ScoredHit>> {
        let filtered: Vec<ScoredHit> = self
            .hits
            .iter()
            .filter(|h| filter.matches(&h.payload))
            .skip(offset)
            .take(topk)
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn size(&self) -> Result<usize> {
        Ok(self.hits.len())
    }

    fn dim(&self) -> usize {
        3
    }

    fn provider_name(&self) -> &str {
        "fake"
    }
}

struct FakeCatalog {
    titles: HashMap<String, String>,
}

#[async_trait]
impl CatalogReader for FakeCatalog {
    async fn ensure_tables(&self, _source: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_pending(&self, _source: &str, _batch_size: usize) -> Result<Vec<PendingRow>> {
        Ok(Vec::new())
    }

    async fn upsert_sync_state(
        &self,
        _source: &str,
        _rows: &[(String, String, String, f32)],
    ) -> Result<()> {
        Ok(())
    }

    async fn mark_failure(&self, _source: &str, _pg_ids: &[String], _error: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_by_ids(&self, _source: &str, pg_ids: &[String]) -> Result<Vec<HydratedRow>> {
        Ok(pg_ids
            .iter()
            .filter_map(|id| {
                self.titles.get(id).map(|title| HydratedRow {
                    pg_id: id.clone(),
                    title: title.clone(),
                    fields: HashMap::new(),
                })
            })
            .collect())
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

fn search_query(q: &str) -> SearchQuery {
    SearchQuery {
        q: q.to_string(),
        topk: 20,
        exclude_nsfw: true,
        tmdb_only: false,
        size_min_gb: None,
        size_sort: None,
        page_size: 20,
        cursor: 0,
    }
}

#[tokio::test]
async fn search_drops_nsfw_hits_and_hydrates_titles() {
    let hits = vec![
        ScoredHit { score: 0.9, payload: payload("movies", "1", "Alien", false) },
        ScoredHit { score: 0.8, payload: payload("movies", "2", "Hidden", true) },
    ];
    let titles = HashMap::from([("1".to_string(), "Alien".to_string())]);

    let service = SearchService::new(
        Arc::new(FakeCatalog { titles }),
        Arc::new(FakeEmbedder),
        Arc::new(FakeVectorStore { hits }),
        None,
        None,
        vec![SourceSearchConfig { name: "movies".to_string(), keyword_search_enabled: false }],
    );

    let response = service.search(&search_query("alien")).await.unwrap();
    assert_eq!(response.count, 1);
    assert_eq!(response.results[0].title, "Alien");
}

#[tokio::test]
async fn search_drops_hits_with_no_catalog_row() {
    let hits = vec![ScoredHit { score: 0.9, payload: payload("movies", "orphan", "Ghost", false) }];
    let service = SearchService::new(
        Arc::new(FakeCatalog { titles: HashMap::new() }),
        Arc::new(FakeEmbedder),
        Arc::new(FakeVectorStore { hits }),
        None,
        None,
        vec![SourceSearchConfig { name: "movies".to_string(), keyword_search_enabled: false }],
    );

    let response = service.search(&search_query("ghost")).await.unwrap();
    assert_eq!(response.count, 0);
}

#[tokio::test]
async fn next_cursor_is_set_only_when_raw_hits_fill_the_page() {
    let hits = vec![
        ScoredHit { score: 0.9, payload: payload("movies", "1", "Alien", false) },
        ScoredHit { score: 0.8, payload: payload("movies", "2", "Aliens", false) },
    ];
    let titles = HashMap::from([
        ("1".to_string(), "Alien".to_string()),
        ("2".to_string(), "Aliens".to_string()),
    ]);
    let mut query = search_query("alien");
    query.topk = 2;
    query.page_size = 2;

    let service = SearchService::new(
        Arc::new(FakeCatalog { titles }),
        Arc::new(FakeEmbedder),
        Arc::new(FakeVectorStore { hits }),
        None,
        None,
        vec![SourceSearchConfig { name: "movies".to_string(), keyword_search_enabled: false }],
    );
    let response = service.search(&query).await.unwrap();
    assert_eq!(response.next_cursor, Some(2));
}

#[tokio::test]
async fn size_sort_puts_unknown_sizes_last() {
    let hits = vec![
        ScoredHit { score: 0.9, payload: payload("movies", "1", "Small", false) },
        ScoredHit { score: 0.8, payload: payload("movies", "2", "Unknown", false) },
    ];
    let titles = HashMap::from([
        ("1".to_string(), "Small".to_string()),
        ("2".to_string(), "Unknown".to_string()),
    ]);

    let mut query = search_query("movie");
    query.size_sort = Some(SizeSort::Asc);

    let service = SearchService::new(
        Arc::new(FakeCatalog { titles }),
        Arc::new(FakeEmbedder),
        Arc::new(FakeVectorStore { hits }),
        None,
        None,
        vec![SourceSearchConfig { name: "movies".to_string(), keyword_search_enabled: false }],
    );
    let response = service.search(&query).await.unwrap();
    assert_eq!(response.results.last().unwrap().title, "Unknown");
}

//! Qdrant-backed vector store ("cluster A": point-collection with native
//! payload filtering).
//!
//! Upsert semantics key each point by the stable uuid derived from
//! `RecordId::vector_id()`, so re-inserting the same `(source, pg_id)`
//! overwrites in place rather than accumulating duplicates.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;

use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::VectorStore;
use mcb_domain::value_objects::{FileType, MetadataFilter, RecordId, ScoredHit, VectorPayload};

/// Qdrant cluster-backed vector store.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimensions: usize,
}

impl QdrantVectorStore {
    /// Connect to `url` and ensure `collection` exists with the given
    /// dimensionality (cosine distance, matching the local HNSW default).
    pub async fn connect(url: &str, collection: impl Into<String>, dimensions: usize) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| Error::vector_db(format!("connecting to qdrant at {url}: {e}")))?;
        let collection = collection.into();

        let exists = client
            .collection_exists(&collection)
            .await
            .map_err(|e| Error::vector_db(format!("checking collection: {e}")))?;
        if !exists {
            client
                .create_collection(
                    CreateCollectionBuilder::new(&collection)
                        .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
                )
                .await
                .map_err(|e| Error::vector_db(format!("creating collection: {e}")))?;
        }

        Ok(Self { client, collection, dimensions })
    }

    fn build_filter(filter: &MetadataFilter) -> Option<Filter> {
        if filter.is_empty() {
            return None;
        }
        let mut must = Vec::new();
        if let Some(true) = filter.has_tmdb {
            must.push(Condition::matches("has_tmdb", true));
        }
        if !filter.genres.is_empty() {
            must.push(Condition::matches(
                "genre_tags",
                filter.genres.iter().cloned().collect::<Vec<_>>(),
            ));
        }
        if let Some(ft) = &filter.file_type {
            must.push(Condition::matches("file_type", ft.as_str().to_string()));
        }
        if !filter.audio_langs.is_empty() {
            must.push(Condition::matches(
                "audio_langs",
                filter.audio_langs.iter().cloned().collect::<Vec<_>>(),
            ));
        }
        if !filter.subtitle_langs.is_empty() {
            must.push(Condition::matches(
                "subtitle_langs",
                filter.subtitle_langs.iter().cloned().collect::<Vec<_>>(),
            ));
        }
        if let Some(min) = filter.size_min {
            must.push(Condition::range(
                "size",
                qdrant_client::qdrant::Range {
                    gte: Some(min as f64),
                    ..Default::default()
                },
            ));
        }
        Some(Filter::must(must))
    }

    fn payload_from_point(payload: &HashMap<String, qdrant_client::qdrant::Value>) -> Option<VectorPayload> {
        let get_str = |k: &str| payload.get(k).and_then(|v| v.as_str().map(str::to_string));
        let get_bool = |k: &str| payload.get(k).and_then(|v| v.as_bool());
        let get_int = |k: &str| payload.get(k).and_then(|v| v.as_integer());

        let source = get_str("source")?;
        let pg_id = get_str("pg_id")?;
        let file_type = get_str("file_type")
            .and_then(|s| s.parse::<FileType>().ok())
            .unwrap_or(FileType::Other);

        Some(VectorPayload {
            id: RecordId::new(&source, &pg_id),
            text_hash: get_str("text_hash").unwrap_or_default(),
            embedding_version: get_str("embedding_version").unwrap_or_default(),
            nsfw: get_bool("nsfw").unwrap_or(false),
            nsfw_score: payload.get("nsfw_score").and_then(|v| v.as_double()).unwrap_or(0.0) as f32,
            has_tmdb: get_bool("has_tmdb").unwrap_or(false),
            tmdb_id: get_int("tmdb_id"),
            has_tpdb: get_bool("has_tpdb").unwrap_or(false),
            tpdb_id: get_str("tpdb_id"),
            genre_tags: payload
                .get("genre_tags")
                .and_then(|v| v.as_list())
                .map(|l| l.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            file_type,
            audio_langs: payload
                .get("audio_langs")
                .and_then(|v| v.as_list())
                .map(|l| l.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            subtitle_langs: payload
                .get("subtitle_langs")
                .and_then(|v| v.as_list())
                .map(|l| l.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            size: get_int("size"),
            title: get_str("title").unwrap_or_default(),
        })
    }

    fn payload_to_map(payload: &VectorPayload) -> HashMap<String, qdrant_client::qdrant::Value> {
        let mut map = HashMap::new();
        map.insert("source".into(), payload.id.source.clone().into());
        map.insert("pg_id".into(), payload.id.pg_id.clone().into());
        map.insert("text_hash".into(), payload.text_hash.clone().into());
        map.insert("embedding_version".into(), payload.embedding_version.clone().into());
        map.insert("nsfw".into(), payload.nsfw.into());
        map.insert("nsfw_score".into(), (payload.nsfw_score as f64).into());
        map.insert("has_tmdb".into(), payload.has_tmdb.into());
        if let Some(id) = payload.tmdb_id {
            map.insert("tmdb_id".into(), id.into());
        }
        map.insert("has_tpdb".into(), payload.has_tpdb.into());
        if let Some(id) = &payload.tpdb_id {
            map.insert("tpdb_id".into(), id.clone().into());
        }
        map.insert(
            "genre_tags".into(),
            payload.genre_tags.iter().cloned().collect::<Vec<_>>().into(),
        );
        map.insert("file_type".into(), payload.file_type.as_str().to_string().into());
        map.insert(
            "audio_langs".into(),
            payload.audio_langs.iter().cloned().collect::<Vec<_>>().into(),
        );
        map.insert(
            "subtitle_langs".into(),
            payload.subtitle_langs.iter().cloned().collect::<Vec<_>>().into(),
        );
        if let Some(size) = payload.size {
            map.insert("size".into(), size.into());
        }
        map.insert("title".into(), payload.title.clone().into());
        map
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn add(&self, vectors: &[Vec<f32>], payloads: &[VectorPayload]) -> Result<Vec<RecordId>> {
        if vectors.len() != payloads.len() {
            return Err(Error::invalid_argument("vectors and payloads length mismatch"));
        }
        let points: Vec<PointStruct> = vectors
            .iter()
            .zip(payloads.iter())
            .map(|(vector, payload)| {
                PointStruct::new(
                    payload.id.vector_id().to_string(),
                    vector.clone(),
                    Self::payload_to_map(payload),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| Error::vector_db(format!("upserting points: {e}")))?;

        Ok(payloads.iter().map(|p| p.id.clone()).collect())
    }

    async fn query(
        &self,
        vector: &[f32],
        topk: usize,
        filter: &MetadataFilter,
        offset: usize,
    ) -> Result<Vec<ScoredHit>> {
        if topk == 0 {
            return Ok(Vec::new());
        }
        let mut builder = SearchPointsBuilder::new(&self.collection, vector.to_vec(), (topk + offset) as u64)
            .with_payload(true);
        if let Some(f) = Self::build_filter(filter) {
            builder = builder.filter(f);
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| Error::vector_db(format!("searching points: {e}")))?;

        let hits: Vec<ScoredHit> = response
            .result
            .into_iter()
            .filter_map(|point| {
                let payload = Self::payload_from_point(&point.payload)?;
                Some(ScoredHit { score: point.score, payload })
            })
            .skip(offset)
            .take(topk)
            .collect();

        Ok(hits)
    }

    async fn size(&self) -> Result<usize> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| Error::vector_db(format!("fetching collection info: {e}")))?;
        Ok(info
            .result
            .and_then(|r| r.points_count)
            .unwrap_or(0) as usize)
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "qdrant"
    }
}

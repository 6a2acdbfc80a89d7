//! Local HNSW vector store backed by the `edgevec` crate.
//!
//! The reference `VectorStore` implementation: cosine-default HNSW, file
//! persisted as `index.bin` (vectors, replayed into the ANN index at load)
//! plus `meta.json` (label -> payload map and the next label counter). A
//! write lock serializes `add` (label allocation/replace, payload map
//! update, ANN insert, atomic persist); `query` takes a read lock so
//! concurrent reads don't block each other, and never blocks on a write's
//! persist step once the write lock is released.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::{Metric, VectorStore};
use mcb_domain::value_objects::{MetadataFilter, RecordId, ScoredHit, VectorPayload};

use crate::constants::{
    EDGEVEC_DEFAULT_DIMENSIONS, EDGEVEC_HNSW_EF_CONSTRUCTION, EDGEVEC_HNSW_EF_SEARCH,
    EDGEVEC_HNSW_M, EDGEVEC_HNSW_M0,
};

/// Configuration for the local HNSW vector store.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct EdgeVecConfig {
    /// Directory holding `index.bin` and `meta.json`.
    pub path: PathBuf,
    /// Vector dimensionality.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    /// HNSW tuning parameters.
    #[serde(default)]
    pub hnsw: HnswConfig,
    /// Distance metric.
    #[serde(default)]
    pub metric: Metric,
    /// Hard cap on the number of live points; `add` errors once reached.
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
}

fn default_dimensions() -> usize {
    EDGEVEC_DEFAULT_DIMENSIONS
}

fn default_max_elements() -> usize {
    1_000_000
}

/// HNSW construction/search parameters.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct HnswConfig {
    /// Maximum connections per node above layer 0.
    #[serde(default = "default_m")]
    pub m: u32,
    /// Maximum connections per node at layer 0.
    #[serde(default = "default_m0")]
    pub m0: u32,
    /// Construction-time candidate list size.
    #[serde(default = "default_ef_construction")]
    pub ef_construction: u32,
    /// Search-time candidate list size.
    #[serde(default = "default_ef_search")]
    pub ef_search: u32,
}

fn default_m() -> u32 {
    EDGEVEC_HNSW_M
}
fn default_m0() -> u32 {
    EDGEVEC_HNSW_M0
}
fn default_ef_construction() -> u32 {
    EDGEVEC_HNSW_EF_CONSTRUCTION
}
fn default_ef_search() -> u32 {
    EDGEVEC_HNSW_EF_SEARCH
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: default_m(),
            m0: default_m0(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct MetaFile {
    next_label: u64,
    entries: Vec<MetaEntry>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct MetaEntry {
    label: u64,
    composite_key: String,
    payload: VectorPayload,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct IndexFile {
    vectors: Vec<(u64, Vec<f32>)>,
}

struct Inner {
    index: edgevec::HnswIndex,
    storage: edgevec::VectorStorage,
    /// label -> (edgevec vector id, payload)
    entries: HashMap<u64, (edgevec::hnsw::VectorId, VectorPayload)>,
    /// composite key (source:pg_id) -> label, for upsert replace semantics.
    by_key: HashMap<String, u64>,
    next_label: u64,
}

/// Local HNSW-backed `VectorStore`.
pub struct EdgeVecVectorStore {
    inner: RwLock<Inner>,
    dir: PathBuf,
    dimensions: usize,
    max_elements: usize,
    metric: Metric,
}

impl EdgeVecVectorStore {
    /// Open (or create) the index at `config.path`, replaying any persisted
    /// vectors into a fresh ANN index.
    pub async fn open(config: EdgeVecConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.path)
            .await
            .map_err(|e| Error::internal(format!("creating vector store dir: {e}")))?;

        let hnsw_config = edgevec::HnswConfig {
            m: config.hnsw.m,
            m0: config.hnsw.m0,
            ef_construction: config.hnsw.ef_construction,
            ef_search: config.hnsw.ef_search,
            dimensions: config.dimensions as u32,
            metric: match config.metric {
                Metric::Euclidean => edgevec::HnswConfig::METRIC_L2_SQUARED,
                Metric::Cosine => edgevec::HnswConfig::METRIC_COSINE,
                Metric::Dot => edgevec::HnswConfig::METRIC_DOT_PRODUCT,
            },
            _reserved: [0; 2],
        };

        let storage = edgevec::VectorStorage::new(&hnsw_config, None);
        let mut index = edgevec::HnswIndex::new(hnsw_config, &storage)
            .map_err(|e| Error::internal(format!("creating HNSW index: {e}")))?;

        let meta = read_meta(&config.path).await?;
        let vectors = read_index(&config.path).await?;
        let vectors_by_label: HashMap<u64, Vec<f32>> = vectors.into_iter().collect();

        let mut entries = HashMap::new();
        let mut by_key = HashMap::new();
        for entry in meta.entries {
            let Some(vector) = vectors_by_label.get(&entry.label) else {
                continue;
            };
            let vector_id = index
                .insert(vector, &mut storage)
                .map_err(|e| Error::internal(format!("replaying vector {}: {e}", entry.label)))?;
            by_key.insert(entry.composite_key.clone(), entry.label);
            entries.insert(entry.label, (vector_id, entry.payload));
        }

        Ok(Self {
            inner: RwLock::new(Inner {
                index,
                storage,
                entries,
                by_key,
                next_label: meta.next_label,
            }),
            dir: config.path,
            dimensions: config.dimensions,
            max_elements: config.max_elements,
            metric: config.metric,
        })
    }

    fn score(&self, distance: f32) -> f32 {
        match self.metric {
            Metric::Cosine => 1.0 - distance,
            Metric::Euclidean => -distance,
            Metric::Dot => distance,
        }
    }

    async fn persist(&self, inner: &Inner) -> Result<()> {
        let meta = MetaFile {
            next_label: inner.next_label,
            entries: inner
                .entries
                .iter()
                .map(|(label, (_, payload))| MetaEntry {
                    label: *label,
                    composite_key: payload.id.composite_key(),
                    payload: payload.clone(),
                })
                .collect(),
        };
        write_atomic(&self.dir.join("meta.json"), &serde_json::to_vec(&meta)?).await?;

        let index_file = IndexFile {
            vectors: inner
                .entries
                .iter()
                .map(|(label, (vector_id, _))| (*label, inner.storage.get(*vector_id).to_vec()))
                .collect(),
        };
        write_atomic(&self.dir.join("index.bin"), &serde_json::to_vec(&index_file)?).await?;
        Ok(())
    }
}

async fn read_meta(dir: &Path) -> Result<MetaFile> {
    match tokio::fs::read(dir.join("meta.json")).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| Error::internal(format!("parsing meta.json: {e}"))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MetaFile {
            next_label: 0,
            entries: Vec::new(),
        }),
        Err(e) => Err(Error::internal(format!("reading meta.json: {e}"))),
    }
}

async fn read_index(dir: &Path) -> Result<Vec<(u64, Vec<f32>)>> {
    match tokio::fs::read(dir.join("index.bin")).await {
        Ok(bytes) => {
            let file: IndexFile = serde_json::from_slice(&bytes)
                .map_err(|e| Error::internal(format!("parsing index.bin: {e}")))?;
            Ok(file.vectors)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(Error::internal(format!("reading index.bin: {e}"))),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| Error::internal(format!("writing {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::internal(format!("renaming into {}: {e}", path.display())))?;
    Ok(())
}

#[async_trait]
impl VectorStore for EdgeVecVectorStore {
    async fn add(&self, vectors: &[Vec<f32>], payloads: &[VectorPayload]) -> Result<Vec<RecordId>> {
        if vectors.len() != payloads.len() {
            return Err(Error::invalid_argument("vectors and payloads length mismatch"));
        }

        let mut inner = self.inner.write().await;
        let mut ids = Vec::with_capacity(payloads.len());

        for (vector, payload) in vectors.iter().zip(payloads.iter()) {
            let key = payload.id.composite_key();
            if let Some(old_label) = inner.by_key.remove(&key) {
                if let Some((old_vector_id, _)) = inner.entries.remove(&old_label) {
                    let _ = inner.index.soft_delete(old_vector_id);
                }
            } else if inner.entries.len() >= self.max_elements {
                return Err(Error::invalid_argument(format!(
                    "vector store at capacity ({} elements)",
                    self.max_elements
                )));
            }

            let label = inner.next_label;
            inner.next_label += 1;
            let vector_id = inner
                .index
                .insert(vector, &mut inner.storage)
                .map_err(|e| Error::vector_db(format!("inserting vector: {e}")))?;
            inner.by_key.insert(key, label);
            inner.entries.insert(label, (vector_id, payload.clone()));
            ids.push(payload.id.clone());
        }

        self.persist(&inner).await?;
        Ok(ids)
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
        let inner = self.inner.read().await;

        let over_fetch = if filter.is_empty() {
            topk + offset
        } else {
            (topk + offset).saturating_mul(3).max(topk + offset + 32)
        };

        let raw = inner
            .index
            .search(vector, over_fetch, &inner.storage)
            .map_err(|e| Error::vector_db(format!("HNSW search failed: {e}")))?;

        let mut hits = Vec::new();
        for result in raw {
            let Some((_, payload)) = inner
                .entries
                .values()
                .find(|(vector_id, _)| *vector_id == result.vector_id)
            else {
                continue;
            };
            if !filter.matches(payload) {
                continue;
            }
            hits.push(ScoredHit {
                score: self.score(result.distance as f32),
                payload: payload.clone(),
            });
        }

        Ok(hits.into_iter().skip(offset).take(topk).collect())
    }

    async fn size(&self) -> Result<usize> {
        Ok(self.inner.read().await.entries.len())
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "edgevec"
    }
}

/// Construct an `EdgeVecVectorStore` behind an `Arc` for composition into a
/// server context.
pub async fn open_shared(config: EdgeVecConfig) -> Result<Arc<EdgeVecVectorStore>> {
    Ok(Arc::new(EdgeVecVectorStore::open(config).await?))
}

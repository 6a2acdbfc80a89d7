//! Sync Coordinator
//!
//! Drives one source's catalog -> vector-store sync cycle: fetch a pending
//! batch (serialized, because the next fetch depends on prior commits),
//! then hand it to a bounded worker pool that runs enrichment -> normalize
//! -> embed -> vector_store.add -> sync-state upsert. An in-flight set
//! keyed by `pg_id` prevents a row from being picked up by two batches at
//! once while earlier batches are still processing.
//!
//! Commit order within a batch is `vector_store.add` then sync-state
//! upsert: if the state upsert fails, the row stays "pending" and the next
//! cycle safely replaces the just-inserted vector with the same
//! `(source, pg_id)` key.

use super::text_normalizer;
use mcb_domain::error::Result;
use mcb_domain::ports::providers::{
    CatalogReader, EmbeddingClient, EnrichmentClient, EnrichmentQuery, EnrichmentRecord,
    EnrichmentStatus, EnrichmentStore, HydratedRow, PendingRow, VectorStore,
};
use mcb_domain::value_objects::{RecordId, VectorPayload};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Per-source runtime configuration the coordinator needs. Catalog schema
/// detail (tables, joins, keyword fields) stays behind [`CatalogReader`]
/// itself and never reaches this layer.
#[derive(Debug, Clone)]
pub struct SourceSyncConfig {
    /// Source name, as configured and passed to every `CatalogReader` call.
    pub name: String,
    /// Rows fetched per pending-batch.
    pub batch_size: usize,
    /// Maximum batches running concurrently for this source.
    pub concurrency: usize,
    /// NSFW classifier threshold applied to this source's rows.
    pub nsfw_threshold: f32,
    /// Enrichment settings, when this source has TMDB/TPDB enrichment enabled.
    pub enrichment: Option<EnrichmentConfig>,
}

/// Enrichment-orchestration settings for one source.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Cache schema key passed to [`EnrichmentStore`] (`"tmdb"`, `"tpdb"`).
    pub schema: String,
    /// `PendingRow::extra` key carrying the upstream reference id.
    pub id_field: String,
    /// `PendingRow::extra` key carrying the content type, when the source
    /// distinguishes one (defaults to `"movie"` when absent).
    pub type_field: Option<String>,
    /// Cap on distinct references resolved per batch.
    pub max_per_batch: usize,
    /// Delay between upstream calls (simple rate limit).
    pub sleep: Duration,
}

/// Outcome of syncing one source to completion (all pending batches drained).
#[derive(Debug, Default, Clone)]
pub struct SourceSyncSummary {
    /// Source name.
    pub source: String,
    /// Number of batches processed.
    pub batches: usize,
    /// Rows successfully embedded and committed.
    pub rows_embedded: usize,
    /// Rows that failed (recorded via `mark_failure`).
    pub rows_failed: usize,
}

/// Orchestrates the sync pipeline for any number of configured sources.
pub struct SyncCoordinator {
    catalog: Arc<dyn CatalogReader>,
    embedder: Arc<dyn EmbeddingClient>,
    vector_store: Arc<dyn VectorStore>,
    enrichment_store: Option<Arc<dyn EnrichmentStore>>,
    enrichment_client: Option<Arc<dyn EnrichmentClient>>,
}

impl SyncCoordinator {
    /// Construct a coordinator. Enrichment dependencies are optional: pass
    /// `None` for both when no configured source enables enrichment.
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        embedder: Arc<dyn EmbeddingClient>,
        vector_store: Arc<dyn VectorStore>,
        enrichment_store: Option<Arc<dyn EnrichmentStore>>,
        enrichment_client: Option<Arc<dyn EnrichmentClient>>,
    ) -> Self {
        Self {
            catalog,
            embedder,
            vector_store,
            enrichment_store,
            enrichment_client,
        }
    }

    /// Drain all pending batches for one source, running up to
    /// `cfg.concurrency` batches in parallel.
    pub async fn sync_source(&self, cfg: &SourceSyncConfig) -> Result<SourceSyncSummary> {
        if self.embedder.dim() != self.vector_store.dim() {
            return Err(mcb_domain::Error::config(format!(
                "source {}: embedding dim {} does not match vector store dim {}",
                cfg.name,
                self.embedder.dim(),
                self.vector_store.dim()
            )));
        }
        self.catalog.ensure_tables(&cfg.name).await?;

        let in_flight: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        let semaphore = Arc::new(Semaphore::new(cfg.concurrency.max(1)));
        let mut summary = SourceSyncSummary {
            source: cfg.name.clone(),
            ..Default::default()
        };
        let mut handles = Vec::new();

        loop {
            let batch = self.catalog.fetch_pending(&cfg.name, cfg.batch_size).await?;
            if batch.is_empty() {
                break;
            }
            let ids: Vec<String> = batch.iter().map(|r| r.pg_id.clone()).collect();
            in_flight.lock().unwrap().extend(ids.iter().cloned());

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("sync semaphore is never closed");
            let catalog = self.catalog.clone();
            let embedder = self.embedder.clone();
            let vector_store = self.vector_store.clone();
            let enrichment_store = self.enrichment_store.clone();
            let enrichment_client = self.enrichment_client.clone();
            let cfg_owned = cfg.clone();
            let in_flight_for_task = in_flight.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let outcome = run_batch(
                    &catalog,
                    &embedder,
                    &vector_store,
                    enrichment_store.as_ref(),
                    enrichment_client.as_ref(),
                    &cfg_owned,
                    batch,
                )
                .await;
                let mut guard = in_flight_for_task.lock().unwrap();
                for id in &ids {
                    guard.remove(id);
                }
                outcome
            });
            handles.push(handle);
            summary.batches += 1;
        }

        for handle in handles {
            match handle.await {
                Ok(outcome) => {
                    summary.rows_embedded += outcome.embedded;
                    summary.rows_failed += outcome.failed;
                }
                Err(join_err) => {
                    warn!(source = %cfg.name, error = %join_err, "sync batch task panicked");
                }
            }
        }

        info!(
            source = %cfg.name,
            batches = summary.batches,
            rows_embedded = summary.rows_embedded,
            rows_failed = summary.rows_failed,
            "sync source complete"
        );
        Ok(summary)
    }
}

struct BatchOutcome {
    embedded: usize,
    failed: usize,
}

async fn run_batch(
    catalog: &Arc<dyn CatalogReader>,
    embedder: &Arc<dyn EmbeddingClient>,
    vector_store: &Arc<dyn VectorStore>,
    enrichment_store: Option<&Arc<dyn EnrichmentStore>>,
    enrichment_client: Option<&Arc<dyn EnrichmentClient>>,
    cfg: &SourceSyncConfig,
    mut batch: Vec<PendingRow>,
) -> BatchOutcome {
    let start = Instant::now();
    let pg_ids: Vec<String> = batch.iter().map(|r| r.pg_id.clone()).collect();

    if let (Some(store), Some(client), Some(enrich_cfg)) =
        (enrichment_store, enrichment_client, cfg.enrichment.as_ref())
    {
        match enrich_batch(store, client, enrich_cfg, &cfg.name, &batch).await {
            Ok(()) => {
                if let Ok(rehydrated) = catalog.fetch_by_ids(&cfg.name, &pg_ids).await {
                    apply_rehydration(&mut batch, rehydrated);
                }
            }
            Err(err) => {
                warn!(source = %cfg.name, error = %err, "enrichment step failed, continuing un-enriched");
            }
        }
    }

    let texts: Vec<String> = batch
        .iter()
        .map(|r| text_normalizer::normalize_title_text(&r.text))
        .collect();

    let embedding = match embedder.infer(&texts).await {
        Ok(batch_result) => batch_result,
        Err(err) => {
            let message = err.to_string();
            if let Err(mark_err) = catalog.mark_failure(&cfg.name, &pg_ids, &message).await {
                warn!(source = %cfg.name, error = %mark_err, "failed to record batch failure");
            }
            warn!(
                source = %cfg.name, rows = pg_ids.len(), error = %message,
                "embedding call failed for batch; rows marked and source halted this cycle"
            );
            return BatchOutcome {
                embedded: 0,
                failed: pg_ids.len(),
            };
        }
    };

    let mut payloads = Vec::with_capacity(batch.len());
    for (row, &nsfw_score) in batch.iter().zip(embedding.nsfw_scores.iter()) {
        let mut payload = build_payload(&cfg.name, row, nsfw_score, embedder.model_version());
        payload.apply_nsfw_threshold(cfg.nsfw_threshold);
        payloads.push(payload);
    }

    if let Err(err) = vector_store.add(&embedding.vectors, &payloads).await {
        warn!(source = %cfg.name, error = %err, "vector store add failed; batch not committed, will retry next cycle");
        return BatchOutcome {
            embedded: 0,
            failed: 0,
        };
    }

    let state_rows: Vec<(String, String, String, f32)> = batch
        .iter()
        .zip(embedding.nsfw_scores.iter())
        .map(|(row, &score)| {
            (
                row.pg_id.clone(),
                row.text_hash.clone(),
                embedder.model_version().to_string(),
                score,
            )
        })
        .collect();
    if let Err(err) = catalog.upsert_sync_state(&cfg.name, &state_rows).await {
        warn!(source = %cfg.name, error = %err, "sync-state upsert failed; rows will be retried next cycle");
    }

    let elapsed = start.elapsed();
    info!(
        source = %cfg.name,
        rows = batch.len(),
        elapsed_ms = elapsed.as_millis(),
        rows_per_sec = batch.len() as f64 / elapsed.as_secs_f64().max(0.001),
        "batch committed"
    );
    BatchOutcome {
        embedded: batch.len(),
        failed: 0,
    }
}

async fn enrich_batch(
    store: &Arc<dyn EnrichmentStore>,
    client: &Arc<dyn EnrichmentClient>,
    cfg: &EnrichmentConfig,
    source: &str,
    batch: &[PendingRow],
) -> Result<()> {
    let mut references = BTreeSet::new();
    for row in batch {
        let Some(id_value) = row.extra.get(&cfg.id_field) else {
            continue;
        };
        let id_str = match id_value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            _ => continue,
        };
        let type_str = cfg
            .type_field
            .as_ref()
            .and_then(|field| row.extra.get(field))
            .and_then(Value::as_str)
            .unwrap_or("movie");
        references.insert(format!("{type_str}:{id_str}"));
    }

    let mut to_fetch = Vec::new();
    for reference in references {
        if store.get(&cfg.schema, &reference).await?.is_none() {
            to_fetch.push(reference);
        }
    }
    to_fetch.truncate(cfg.max_per_batch);

    for reference in to_fetch {
        let query = EnrichmentQuery {
            reference: reference.clone(),
            params: Value::Null,
        };
        let record = match client.fetch(&query).await {
            Ok(record) => record,
            Err(err) => EnrichmentRecord {
                status: EnrichmentStatus::Error,
                fields: Value::Null,
                raw: Value::Null,
                message: Some(err.to_string()),
            },
        };
        if let Err(err) = store.put(&cfg.schema, &reference, record).await {
            warn!(source, reference = %reference, error = %err, "failed to cache enrichment record");
        }
        if !cfg.sleep.is_zero() {
            tokio::time::sleep(cfg.sleep).await;
        }
    }
    Ok(())
}

/// Merge a post-enrichment hydration pass back into the batch so derived
/// fields (genre, keywords, overview) are reflected in the text and tags
/// used for embedding.
fn apply_rehydration(batch: &mut [PendingRow], rehydrated: Vec<HydratedRow>) {
    let mut by_id: HashMap<String, HydratedRow> =
        rehydrated.into_iter().map(|r| (r.pg_id.clone(), r)).collect();
    for row in batch.iter_mut() {
        let Some(hydrated) = by_id.remove(&row.pg_id) else {
            continue;
        };
        for (key, value) in hydrated.fields {
            if matches!(key.as_str(), "genre" | "keywords" | "overview" | "aka") {
                if let Some(text) = value.as_str().filter(|s| !s.is_empty()) {
                    row.text.push(' ');
                    row.text.push_str(text);
                }
            }
            row.extra.insert(key, value);
        }
    }
}

fn build_payload(
    source: &str,
    row: &PendingRow,
    nsfw_score: f32,
    embedding_version: &str,
) -> VectorPayload {
    let languages = text_normalizer::detect_languages(&row.text);
    let genre_tags: BTreeSet<String> = text_normalizer::detect_genres(&row.text).into_iter().collect();
    let extras: serde_json::Map<String, Value> = row
        .extra
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let size = text_normalizer::extract_size(&extras);
    let tmdb_id = row.extra.get("tmdb_id").and_then(Value::as_i64);
    let tpdb_id = row
        .extra
        .get("tpdb_id")
        .and_then(Value::as_str)
        .map(str::to_string);
    let title = row
        .extra
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| row.text.clone());

    VectorPayload {
        id: RecordId::new(source, row.pg_id.clone()),
        text_hash: row.text_hash.clone(),
        embedding_version: embedding_version.to_string(),
        nsfw: false,
        nsfw_score,
        has_tmdb: tmdb_id.is_some(),
        tmdb_id,
        has_tpdb: tpdb_id.is_some(),
        tpdb_id,
        genre_tags,
        file_type: text_normalizer::detect_file_type(&row.text),
        audio_langs: languages.audio,
        subtitle_langs: languages.subtitle,
        size,
        title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(pg_id: &str, text: &str) -> PendingRow {
        PendingRow {
            pg_id: pg_id.to_string(),
            text: text.to_string(),
            text_hash: format!("{:x}", md5::compute(text)),
            updated_at: Some(Utc::now()),
            extra: HashMap::new(),
        }
    }

    #[test]
    fn build_payload_derives_tags_from_raw_text() {
        let r = row("1", "恐怖电影.mkv 国语中字");
        let payload = build_payload("movies", &r, 0.9, "v1");
        assert_eq!(payload.file_type, mcb_domain::value_objects::FileType::Video);
        assert!(payload.genre_tags.contains("恐怖"));
        assert!(payload.subtitle_langs.contains("zh"));
    }

    #[test]
    fn apply_rehydration_merges_fields_and_appends_text() {
        let mut batch = vec![row("1", "Alien")];
        let hydrated = vec![HydratedRow {
            pg_id: "1".to_string(),
            title: "Alien".to_string(),
            fields: HashMap::from([("genre".to_string(), Value::String("Horror".to_string()))]),
        }];
        apply_rehydration(&mut batch, hydrated);
        assert!(batch[0].text.contains("Horror"));
        assert_eq!(
            batch[0].extra.get("genre").and_then(Value::as_str),
            Some("Horror")
        );
    }
}

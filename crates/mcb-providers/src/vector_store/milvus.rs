//! Milvus-backed vector store ("cluster B": columnar vector collection).
//!
//! The collection uses an auto-assigned int64 primary key; upsert-by-key is
//! emulated by querying for rows whose `composite_key` column matches,
//! deleting them, then inserting the replacements. Multi-valued genre and
//! language fields are stored as JSON-encoded varchars and re-filtered
//! in-process after the ANN search returns.

use async_trait::async_trait;
use milvus::client::Client;
use milvus::data::FieldColumn;
use milvus::index::{IndexParams, IndexType, MetricType};
use milvus::mutate::DeleteOptions;
use milvus::proto::schema::DataType;
use milvus::query::{QueryOptions, SearchOptions};
use milvus::schema::{CollectionSchemaBuilder, FieldSchema};
use milvus::value::{Value, ValueVec};
use std::borrow::Cow;
use std::collections::HashMap;

use crate::constants::{MILVUS_FIELD_VARCHAR_MAX_LENGTH, MILVUS_IVFFLAT_NLIST, MILVUS_METADATA_VARCHAR_MAX_LENGTH};
use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::VectorStore;
use mcb_domain::value_objects::{FileType, MetadataFilter, RecordId, ScoredHit, VectorPayload};

const OUTPUT_FIELDS: &[&str] = &[
    "composite_key", "source", "pg_id", "title", "text_hash", "embedding_version", "nsfw",
    "nsfw_score", "has_tmdb", "tmdb_id", "has_tpdb", "tpdb_id", "genre_tags", "file_type",
    "audio_langs", "subtitle_langs", "size",
];

/// Milvus cluster-backed vector store for a single fixed collection.
pub struct MilvusVectorStore {
    client: Client,
    collection: String,
    dimensions: usize,
}

impl MilvusVectorStore {
    /// Connect and ensure the collection (and its IVF_FLAT index) exist.
    pub async fn connect(address: &str, collection: impl Into<String>, dimensions: usize) -> Result<Self> {
        let endpoint = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };
        let client = Client::new(endpoint.clone())
            .await
            .map_err(|e| Error::vector_db(format!("connecting to milvus at {endpoint}: {e}")))?;
        let collection = collection.into();

        if !client
            .has_collection(&collection)
            .await
            .map_err(|e| Error::vector_db(format!("checking collection: {e}")))?
        {
            Self::create_collection(&client, &collection, dimensions).await?;
        }

        Ok(Self { client, collection, dimensions })
    }

    async fn create_collection(client: &Client, name: &str, dimensions: usize) -> Result<()> {
        let schema = CollectionSchemaBuilder::new(name, "media catalog vectors")
            .add_field(FieldSchema::new_primary_int64("id", "primary key", true))
            .add_field(FieldSchema::new_float_vector("vector", "embedding", dimensions as i64))
            .add_field(FieldSchema::new_varchar(
                "composite_key",
                "source:pg_id upsert key",
                MILVUS_FIELD_VARCHAR_MAX_LENGTH,
            ))
            .add_field(FieldSchema::new_varchar("source", "source tag", MILVUS_FIELD_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_varchar("pg_id", "catalog row id", MILVUS_FIELD_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_varchar("title", "display title", MILVUS_METADATA_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_varchar("text_hash", "source text hash", MILVUS_FIELD_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_varchar("embedding_version", "model version", MILVUS_FIELD_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_int64("nsfw", "nsfw flag, 0/1"))
            .add_field(FieldSchema::new_varchar("nsfw_score", "nsfw classifier score", MILVUS_FIELD_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_int64("has_tmdb", "has tmdb match, 0/1"))
            .add_field(FieldSchema::new_int64("tmdb_id", "tmdb id, -1 if absent"))
            .add_field(FieldSchema::new_int64("has_tpdb", "has tpdb match, 0/1"))
            .add_field(FieldSchema::new_varchar("tpdb_id", "tpdb id, empty if absent", MILVUS_FIELD_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_varchar("genre_tags", "json array", MILVUS_METADATA_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_varchar("file_type", "file type", MILVUS_FIELD_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_varchar("audio_langs", "json array", MILVUS_METADATA_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_varchar("subtitle_langs", "json array", MILVUS_METADATA_VARCHAR_MAX_LENGTH))
            .add_field(FieldSchema::new_int64("size", "bytes, -1 if unknown"))
            .build()
            .map_err(|e| Error::vector_db(format!("building schema: {e}")))?;

        client
            .create_collection(schema, None)
            .await
            .map_err(|e| Error::vector_db(format!("creating collection: {e}")))?;

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        let index_params = IndexParams::new(
            "vector_index".to_string(),
            IndexType::IvfFlat,
            MetricType::L2,
            HashMap::from([("nlist".to_string(), MILVUS_IVFFLAT_NLIST.to_string())]),
        );

        let mut last_error = None;
        for attempt in 0..3 {
            match client.create_index(name, "vector", index_params.clone()).await {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    let err_str = e.to_string();
                    if err_str.contains("CollectionNotExists") || err_str.contains("collection not found") {
                        last_error = Some(e);
                        tokio::time::sleep(std::time::Duration::from_millis(500 * (attempt + 1) as u64)).await;
                        continue;
                    }
                    return Err(Error::vector_db(format!("creating index: {e}")));
                }
            }
        }
        if let Some(e) = last_error {
            return Err(Error::vector_db(format!("creating index after retries: {e}")));
        }
        Ok(())
    }

    fn json_array(values: impl IntoIterator<Item = String>) -> String {
        serde_json::to_string(&values.into_iter().collect::<Vec<_>>()).unwrap_or_else(|_| "[]".to_string())
    }

    fn parse_json_array(raw: &str) -> std::collections::BTreeSet<String> {
        serde_json::from_str(raw).unwrap_or_default()
    }

    fn build_expr(filter: &MetadataFilter) -> Option<String> {
        let mut clauses = Vec::new();
        if let Some(true) = filter.has_tmdb {
            clauses.push("has_tmdb == 1".to_string());
        }
        if let Some(ft) = &filter.file_type {
            clauses.push(format!("file_type == \"{}\"", ft.as_str()));
        }
        if let Some(min) = filter.size_min {
            clauses.push(format!("size >= {min}"));
        }
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" && "))
        }
    }

    fn row_to_payload(columns: &HashMap<&str, &FieldColumn>, i: usize) -> Option<VectorPayload> {
        let str_at = |name: &str| match columns.get(name)?.get(i) {
            Some(Value::String(s)) => Some(s.to_string()),
            _ => None,
        };
        let int_at = |name: &str| match columns.get(name)?.get(i) {
            Some(Value::Long(n)) => Some(n),
            _ => None,
        };
        let bool_at = |name: &str| int_at(name).map(|n| n != 0).unwrap_or(false);

        let source = str_at("source")?;
        let pg_id = str_at("pg_id")?;
        let file_type = str_at("file_type")
            .and_then(|s| s.parse::<FileType>().ok())
            .unwrap_or(FileType::Other);

        Some(VectorPayload {
            id: RecordId::new(&source, &pg_id),
            text_hash: str_at("text_hash").unwrap_or_default(),
            embedding_version: str_at("embedding_version").unwrap_or_default(),
            nsfw: bool_at("nsfw"),
            nsfw_score: str_at("nsfw_score").and_then(|s| s.parse::<f32>().ok()).unwrap_or(0.0),
            has_tmdb: bool_at("has_tmdb"),
            tmdb_id: int_at("tmdb_id").filter(|v| *v >= 0),
            has_tpdb: bool_at("has_tpdb"),
            tpdb_id: str_at("tpdb_id").filter(|s| !s.is_empty()),
            genre_tags: str_at("genre_tags").map(|s| Self::parse_json_array(&s)).unwrap_or_default(),
            file_type,
            audio_langs: str_at("audio_langs").map(|s| Self::parse_json_array(&s)).unwrap_or_default(),
            subtitle_langs: str_at("subtitle_langs").map(|s| Self::parse_json_array(&s)).unwrap_or_default(),
            size: int_at("size").filter(|v| *v >= 0),
            title: str_at("title").unwrap_or_default(),
        })
    }

    async fn delete_existing(&self, composite_keys: &[String]) -> Result<()> {
        let expr = format!(
            "composite_key in [{}]",
            composite_keys.iter().map(|k| format!("\"{k}\"")).collect::<Vec<_>>().join(",")
        );
        let mut query_options = QueryOptions::new();
        query_options = query_options.output_fields(vec!["id".to_string()]);
        let existing = self
            .client
            .query(&self.collection, &expr, &query_options)
            .await
            .map_err(|e| Error::vector_db(format!("querying existing rows: {e}")))?;

        let ids: Vec<i64> = existing
            .iter()
            .find(|c| c.name == "id")
            .map(|c| {
                (0..c.len())
                    .filter_map(|i| match c.get(i) {
                        Some(Value::Long(n)) => Some(n),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if ids.is_empty() {
            return Ok(());
        }
        let options = DeleteOptions::with_ids(ValueVec::Long(ids));
        self.client
            .delete(&self.collection, &options)
            .await
            .map_err(|e| Error::vector_db(format!("deleting existing rows: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MilvusVectorStore {
    async fn add(&self, vectors: &[Vec<f32>], payloads: &[VectorPayload]) -> Result<Vec<RecordId>> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }
        if vectors.len() != payloads.len() {
            return Err(Error::invalid_argument("vectors and payloads length mismatch"));
        }

        let composite_keys: Vec<String> = payloads.iter().map(|p| p.id.composite_key()).collect();
        self.delete_existing(&composite_keys).await?;

        let mut vectors_flat = Vec::new();
        for v in vectors {
            vectors_flat.extend_from_slice(v);
        }

        let varchar = |name: &str, values: Vec<String>, max_len: i64| FieldColumn {
            name: name.to_string(),
            dtype: DataType::VarChar,
            value: ValueVec::String(values),
            dim: 1,
            max_length: max_len,
            is_dynamic: false,
        };
        let int64 = |name: &str, values: Vec<i64>| FieldColumn {
            name: name.to_string(),
            dtype: DataType::Int64,
            value: ValueVec::Long(values),
            dim: 1,
            max_length: 0,
            is_dynamic: false,
        };

        let columns = vec![
            FieldColumn {
                name: "vector".to_string(),
                dtype: DataType::FloatVector,
                value: ValueVec::Float(vectors_flat),
                dim: self.dimensions as i64,
                max_length: 0,
                is_dynamic: false,
            },
            varchar("composite_key", composite_keys.clone(), MILVUS_FIELD_VARCHAR_MAX_LENGTH),
            varchar("source", payloads.iter().map(|p| p.id.source.clone()).collect(), MILVUS_FIELD_VARCHAR_MAX_LENGTH),
            varchar("pg_id", payloads.iter().map(|p| p.id.pg_id.clone()).collect(), MILVUS_FIELD_VARCHAR_MAX_LENGTH),
            varchar("title", payloads.iter().map(|p| p.title.clone()).collect(), MILVUS_METADATA_VARCHAR_MAX_LENGTH),
            varchar("text_hash", payloads.iter().map(|p| p.text_hash.clone()).collect(), MILVUS_FIELD_VARCHAR_MAX_LENGTH),
            varchar(
                "embedding_version",
                payloads.iter().map(|p| p.embedding_version.clone()).collect(),
                MILVUS_FIELD_VARCHAR_MAX_LENGTH,
            ),
            int64("nsfw", payloads.iter().map(|p| p.nsfw as i64).collect()),
            varchar(
                "nsfw_score",
                payloads.iter().map(|p| p.nsfw_score.to_string()).collect(),
                MILVUS_FIELD_VARCHAR_MAX_LENGTH,
            ),
            int64("has_tmdb", payloads.iter().map(|p| p.has_tmdb as i64).collect()),
            int64("tmdb_id", payloads.iter().map(|p| p.tmdb_id.unwrap_or(-1)).collect()),
            int64("has_tpdb", payloads.iter().map(|p| p.has_tpdb as i64).collect()),
            varchar(
                "tpdb_id",
                payloads.iter().map(|p| p.tpdb_id.clone().unwrap_or_default()).collect(),
                MILVUS_FIELD_VARCHAR_MAX_LENGTH,
            ),
            varchar(
                "genre_tags",
                payloads.iter().map(|p| Self::json_array(p.genre_tags.iter().cloned())).collect(),
                MILVUS_METADATA_VARCHAR_MAX_LENGTH,
            ),
            varchar(
                "file_type",
                payloads.iter().map(|p| p.file_type.as_str().to_string()).collect(),
                MILVUS_FIELD_VARCHAR_MAX_LENGTH,
            ),
            varchar(
                "audio_langs",
                payloads.iter().map(|p| Self::json_array(p.audio_langs.iter().cloned())).collect(),
                MILVUS_METADATA_VARCHAR_MAX_LENGTH,
            ),
            varchar(
                "subtitle_langs",
                payloads.iter().map(|p| Self::json_array(p.subtitle_langs.iter().cloned())).collect(),
                MILVUS_METADATA_VARCHAR_MAX_LENGTH,
            ),
            int64("size", payloads.iter().map(|p| p.size.unwrap_or(-1)).collect()),
        ];

        self.client
            .insert(&self.collection, columns, None)
            .await
            .map_err(|e| Error::vector_db(format!("inserting vectors: {e}")))?;

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

        if let Err(e) = self.client.load_collection(&self.collection, None).await {
            let err_str = e.to_string();
            if err_str.contains("CollectionNotExists") || err_str.contains("not exist") {
                return Ok(Vec::new());
            }
            return Err(Error::vector_db(format!("loading collection: {e}")));
        }

        let over_fetch = (topk + offset).saturating_mul(3).max(topk + offset + 32);
        let mut options = SearchOptions::new()
            .limit(over_fetch)
            .output_fields(OUTPUT_FIELDS.iter().map(|s| s.to_string()).collect())
            .add_param("metric_type", "L2");
        if let Some(expr) = Self::build_expr(filter) {
            options = options.expr(expr);
        }

        let search_results = match self
            .client
            .search(&self.collection, vec![Value::FloatArray(Cow::Borrowed(vector))], Some(options))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let err_str = e.to_string();
                if err_str.contains("no IDs") || err_str.contains("empty") {
                    return Ok(Vec::new());
                }
                return Err(Error::vector_db(format!("searching: {e}")));
            }
        };

        let mut hits = Vec::new();
        for result in search_results {
            let columns: HashMap<&str, &FieldColumn> =
                result.field.iter().map(|c| (c.name.as_str(), c)).collect();
            for (i, distance) in result.score.iter().enumerate() {
                let Some(payload) = Self::row_to_payload(&columns, i) else { continue };
                if !filter.matches(&payload) {
                    continue;
                }
                let score = (-distance).exp();
                hits.push(ScoredHit { score, payload });
            }
        }

        Ok(hits.into_iter().skip(offset).take(topk).collect())
    }

    async fn size(&self) -> Result<usize> {
        let stats = self
            .client
            .get_collection_stats(&self.collection)
            .await
            .map_err(|e| Error::vector_db(format!("fetching stats: {e}")))?;
        Ok(stats
            .get("row_count")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0))
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "milvus"
    }
}

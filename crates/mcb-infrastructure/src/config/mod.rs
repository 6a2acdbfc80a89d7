//! Typed application configuration.
//!
//! Mirrors the top-level config file keys: `gpu_endpoint`,
//! `embedding_model_version`, `nsfw_threshold`, `postgres`, `vector_store`,
//! `sync`, `sources[]`, `local_embedder`, `tmdb`, `tpdb`, `bitmagnet`,
//! `auth`, `search`, `logging`. Loading itself (layering + validation)
//! lives in [`loader`].

pub mod loader;

use mcb_providers::catalog::SourceCatalogConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_true() -> bool {
    true
}

/// Root configuration, deserialized from defaults -> TOML -> env.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// GPU inference sidecar base URL, when remote embedding is used.
    pub gpu_endpoint: Option<String>,
    /// Embedding model version tag recorded on every vector payload.
    pub embedding_model_version: String,
    /// NSFW classifier threshold (`nsfw_score >= threshold`).
    pub nsfw_threshold: f32,
    /// Relational catalog connection.
    pub postgres: PostgresConfig,
    /// Vector store backend selection and tuning.
    pub vector_store: VectorStoreConfig,
    /// Global sync defaults, overridden per-source.
    pub sync: SyncDefaults,
    /// Configured catalog sources.
    pub sources: Vec<SourceConfig>,
    /// Local in-process embedder settings.
    pub local_embedder: LocalEmbedderConfig,
    /// TMDB enrichment settings.
    pub tmdb: TmdbConfig,
    /// TPDB enrichment settings.
    pub tpdb: TpdbConfig,
    /// Bitmagnet keyword search settings.
    pub bitmagnet: BitmagnetConfig,
    /// Bearer-token authentication settings.
    pub auth: AuthConfig,
    /// Search-path defaults.
    pub search: SearchConfig,
    /// Structured logging settings.
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gpu_endpoint: None,
            embedding_model_version: "v1".to_string(),
            nsfw_threshold: 0.7,
            postgres: PostgresConfig::default(),
            vector_store: VectorStoreConfig::default(),
            sync: SyncDefaults::default(),
            sources: Vec::new(),
            local_embedder: LocalEmbedderConfig::default(),
            tmdb: TmdbConfig::default(),
            tpdb: TpdbConfig::default(),
            bitmagnet: BitmagnetConfig::default(),
            auth: AuthConfig::default(),
            search: SearchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Relational catalog connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// libpq-style connection string. Required; validated at load time.
    pub dsn: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self { dsn: String::new() }
    }
}

/// Vector store backend tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreKind {
    /// Local file-backed HNSW (the reference backend).
    Local,
    /// Qdrant cluster.
    Qdrant,
    /// Milvus cluster.
    Milvus,
}

impl Default for VectorStoreKind {
    fn default() -> Self {
        Self::Local
    }
}

/// `vector_store.*` config section. Fields not relevant to the selected
/// `type` are simply ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Backend selector.
    #[serde(rename = "type")]
    pub kind: VectorStoreKind,
    /// Local backend: directory holding `index.bin` + `meta.json`.
    pub path: String,
    /// Vector dimensionality.
    pub dim: usize,
    /// Similarity metric (local backend).
    pub metric: mcb_domain::ports::providers::Metric,
    /// Local backend: hard cap on live points.
    pub max_elements: usize,
    /// Local backend: HNSW construction candidate list size.
    pub ef_construction: u32,
    /// Local backend: HNSW max connections per node.
    #[serde(rename = "M")]
    pub m: u32,
    /// Local backend: HNSW search candidate list size.
    pub ef_search: u32,
    /// Cluster backend: connection URL.
    pub url: Option<String>,
    /// Cluster backend: collection name.
    pub collection: String,
    /// Cluster backend: API key, when required.
    pub api_key: Option<String>,
    /// Cluster backend: alternate URI field (Milvus address).
    pub uri: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            kind: VectorStoreKind::default(),
            path: "./data/vector_index".to_string(),
            dim: 384,
            metric: mcb_domain::ports::providers::Metric::default(),
            max_elements: 1_000_000,
            ef_construction: 200,
            m: 16,
            ef_search: 64,
            url: None,
            collection: "catalog".to_string(),
            api_key: None,
            uri: None,
        }
    }
}

/// `sync.*`: global defaults, overridden per-source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncDefaults {
    /// Rows fetched per pending-batch.
    pub batch_size: usize,
    /// Maximum batches running concurrently per source.
    pub concurrency: usize,
}

impl Default for SyncDefaults {
    fn default() -> Self {
        Self { batch_size: 200, concurrency: 4 }
    }
}

/// `sources[].pg.*`: catalog schema description for one source, plus the
/// feature toggles the sync/search pipelines read alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePgConfig {
    /// Source table, `schema.table` or bare `table`.
    pub table: String,
    /// Primary key column.
    pub id_field: String,
    /// Column concatenated/hashed for sync and embedding.
    pub text_field: String,
    /// Column driving incremental sync, when present.
    pub updated_at_field: Option<String>,
    /// Additional columns surfaced in hydrated rows.
    pub extra_fields: Vec<String>,
    /// Joins applied when hydrating `fetch_by_ids`.
    pub joins: Vec<mcb_providers::catalog::JoinConfig>,
    /// Columns searched by `search_by_keyword`.
    pub keyword_fields: Vec<String>,
    /// Enable the SQL `ILIKE` keyword-search path for this source.
    #[serde(default = "default_true")]
    pub keyword_search: bool,
    /// Normalize keyword-query tokens the same way titles are normalized.
    pub keyword_normalize: bool,
    /// Column carrying a file/torrent size in bytes, when present.
    pub size_field: Option<String>,
    /// Enable TMDB enrichment for this source.
    pub tmdb_enrich: bool,
    /// Enable TPDB enrichment for this source.
    pub tpdb_enrich: bool,
    /// Extra `WHERE` predicate ANDed onto every query against this source.
    pub r#where: Option<String>,
    /// Column flagging a row as TMDB-eligible, when the source needs one.
    pub tmdb_only_field: Option<String>,
}

impl Default for SourcePgConfig {
    fn default() -> Self {
        Self {
            table: String::new(),
            id_field: "id".to_string(),
            text_field: "title".to_string(),
            updated_at_field: None,
            extra_fields: Vec::new(),
            joins: Vec::new(),
            keyword_fields: Vec::new(),
            keyword_search: true,
            keyword_normalize: true,
            size_field: None,
            tmdb_enrich: false,
            tpdb_enrich: false,
            r#where: None,
            tmdb_only_field: None,
        }
    }
}

impl SourcePgConfig {
    /// Build the `CatalogReader`-facing schema description for this source.
    pub fn to_catalog_config(&self) -> SourceCatalogConfig {
        SourceCatalogConfig {
            table: self.table.clone(),
            id_field: self.id_field.clone(),
            text_field: self.text_field.clone(),
            title_field: None,
            updated_at_field: self.updated_at_field.clone(),
            order_field: self.updated_at_field.clone().unwrap_or_else(|| self.id_field.clone()),
            extra_fields: self.extra_fields.clone(),
            joins: self.joins.clone(),
            keyword_fields: self.keyword_fields.clone(),
            where_clause: self.r#where.clone(),
        }
    }
}

/// Per-source `sync.*` override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSyncOverride {
    /// Rows fetched per pending-batch; falls back to the global default when absent.
    pub batch_size: Option<usize>,
    /// Maximum concurrent batches; falls back to the global default when absent.
    pub concurrency: Option<usize>,
}

impl Default for SourceSyncOverride {
    fn default() -> Self {
        Self { batch_size: None, concurrency: None }
    }
}

/// `sources[].tagging.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceTaggingConfig {
    /// Whether the NSFW classifier threshold applies to this source.
    pub nsfw: bool,
}

impl Default for SourceTaggingConfig {
    fn default() -> Self {
        Self { nsfw: true }
    }
}

/// One entry of `sources[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source name, passed to every `CatalogReader` call.
    pub name: String,
    /// Catalog schema description.
    pub pg: SourcePgConfig,
    /// Per-source sync overrides.
    pub sync: SourceSyncOverride,
    /// Classifier tagging toggles.
    pub tagging: SourceTaggingConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            pg: SourcePgConfig::default(),
            sync: SourceSyncOverride::default(),
            tagging: SourceTaggingConfig::default(),
        }
    }
}

/// `local_embedder.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalEmbedderConfig {
    /// Enable the in-process fastembed client, paired with the remote one via fallback.
    pub enabled: bool,
    /// Model name/tag (informational; the fastembed adapter uses a fixed default model).
    pub model_name: String,
}

impl Default for LocalEmbedderConfig {
    fn default() -> Self {
        Self { enabled: false, model_name: "AllMiniLML6V2".to_string() }
    }
}

/// `tmdb.limits.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbLimitsConfig {
    /// Max actors retained per record.
    pub actors: usize,
    /// Max directors retained per record.
    pub directors: usize,
    /// Max alternative titles retained per record.
    pub aka: usize,
}

impl Default for TmdbLimitsConfig {
    fn default() -> Self {
        Self { actors: 10, directors: 5, aka: 10 }
    }
}

/// `tmdb.imdb.*` / `tmdb.douban.*`: auxiliary cross-reference lookups,
/// disabled unless a deployment supplies an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbCrossRefConfig {
    /// Enable this cross-reference lookup.
    pub enabled: bool,
    /// Lookup endpoint base URL.
    pub base_url: Option<String>,
}

impl Default for TmdbCrossRefConfig {
    fn default() -> Self {
        Self { enabled: false, base_url: None }
    }
}

/// `tmdb.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    /// Enable TMDB enrichment entirely.
    pub enabled: bool,
    /// Auto-enrich missing references during sync (vs. on-demand `/tmdb_detail` only).
    pub auto_enrich: bool,
    /// API key, when not sourced from `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable name to read the API key from.
    pub api_key_env: Option<String>,
    /// TMDB API base URL.
    pub base_url: String,
    /// Response language.
    pub language: String,
    /// Per-record field caps.
    pub limits: TmdbLimitsConfig,
    /// Delay between upstream calls within a batch.
    pub sleep_seconds: f64,
    /// Per-request timeout.
    pub timeout_seconds: u64,
    /// Cap on distinct references resolved per sync batch.
    pub max_per_batch: usize,
    /// Enable aka/keyword-derived query expansion.
    pub query_expand: bool,
    /// Maximum expansion tokens fetched per query.
    pub query_expand_limit: usize,
    /// IMDB cross-reference lookup.
    pub imdb: TmdbCrossRefConfig,
    /// Douban cross-reference lookup.
    pub douban: TmdbCrossRefConfig,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_enrich: false,
            api_key: None,
            api_key_env: Some("TMDB_API_KEY".to_string()),
            base_url: "https://api.themoviedb.org/3".to_string(),
            language: "en-US".to_string(),
            limits: TmdbLimitsConfig::default(),
            sleep_seconds: 0.25,
            timeout_seconds: 10,
            max_per_batch: 50,
            query_expand: false,
            query_expand_limit: 8,
            imdb: TmdbCrossRefConfig::default(),
            douban: TmdbCrossRefConfig::default(),
        }
    }
}

/// `tpdb.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TpdbConfig {
    /// Enable TPDB enrichment entirely.
    pub enabled: bool,
    /// API token, when not sourced from an environment variable.
    pub token: Option<String>,
    /// GraphQL endpoint.
    pub endpoint: String,
    /// Named GraphQL query documents, keyed by a caller-chosen tag
    /// (e.g. `"scene"`, `"movie"`); the one actually used is the first entry.
    pub queries: HashMap<String, String>,
    /// Result-path overrides, keyed the same way as `queries`.
    pub result_paths: HashMap<String, String>,
    /// Auth header name.
    pub auth_header: String,
    /// Auth header value prefix (e.g. `"Bearer"`), when required.
    pub auth_prefix: Option<String>,
    /// TTL for cached positive enrichment results.
    pub cache_ttl_hours: u64,
    /// TTL for cached not-found results, to suppress repeat probing.
    pub not_found_ttl_hours: u64,
    /// Max candidates requested per search query.
    pub search_limit: usize,
    /// Require a regex-extracted release code before attempting a lookup.
    pub require_code: bool,
    /// Content type assumed when a row has no explicit type column.
    pub default_type: String,
}

impl Default for TpdbConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            endpoint: "https://theporndb.net/graphql".to_string(),
            queries: HashMap::new(),
            result_paths: HashMap::new(),
            auth_header: "Authorization".to_string(),
            auth_prefix: Some("Bearer".to_string()),
            cache_ttl_hours: 24 * 30,
            not_found_ttl_hours: 24,
            search_limit: 5,
            require_code: true,
            default_type: "movie".to_string(),
        }
    }
}

/// `bitmagnet.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BitmagnetConfig {
    /// Enable the bitmagnet GraphQL keyword-search backend.
    pub enabled: bool,
    /// Catalog schema bitmagnet content lives under.
    pub schema: String,
    /// Create the schema on `ensure_tables` if it doesn't exist.
    pub create_schema: bool,
    /// Bitmagnet host (informational; `graphql_endpoint` is what's actually dialed).
    pub host: Option<String>,
    /// GraphQL endpoint URL.
    pub graphql_endpoint: String,
    /// Per-request timeout.
    pub graphql_timeout_seconds: u64,
    /// Hard cap applied to any caller-requested search limit.
    pub graphql_search_limit_cap: usize,
}

impl Default for BitmagnetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            schema: "bitmagnet".to_string(),
            create_schema: false,
            host: None,
            graphql_endpoint: "http://localhost:3333/graphql".to_string(),
            graphql_timeout_seconds: 10,
            graphql_search_limit_cap: 100,
        }
    }
}

/// `auth.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Enforce bearer-token auth on every endpoint.
    pub enabled: bool,
    /// Bootstrap admin username.
    pub admin_user: String,
    /// Bootstrap admin password.
    pub admin_password: String,
    /// Path to the JSON-backed additional-user store.
    pub user_store_path: String,
    /// Path token state would persist to, when the deployment wants token
    /// survival across restarts (tokens are otherwise in-memory only).
    pub token_store_path: Option<String>,
    /// Bearer token time-to-live.
    pub token_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            admin_user: "admin".to_string(),
            admin_password: String::new(),
            user_store_path: "./data/users.json".to_string(),
            token_store_path: None,
            token_ttl_seconds: 86400,
        }
    }
}

/// `search.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Keyword-search backend tag: `"sql"` (per-source `search_by_keyword`)
    /// or `"bitmagnet"` (GraphQL backend).
    pub keyword_backend: String,
    /// Prefix prepended to the cleaned keyword query before dispatch.
    pub query_prefix: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { keyword_backend: "sql".to_string(), query_prefix: None }
    }
}

/// `logging.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`/`debug`/`info`/`warn`/`error`.
    pub level: String,
    /// `"json"` or `"text"`.
    pub format: String,
    /// Optional file path; when set, logs also rotate daily to this path.
    pub file_output: Option<std::path::PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "text".to_string(), file_output: None }
    }
}

impl LoggingConfig {
    /// Whether `format` resolves to JSON output.
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

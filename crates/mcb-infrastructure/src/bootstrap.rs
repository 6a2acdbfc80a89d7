//! Server context composition.
//!
//! Builds every adapter selected by [`AppConfig`] once, at process
//! startup, and assembles them into a single [`Server`] value. Handlers
//! and background workers receive `Arc<Server>` rather than reaching for
//! module-global state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mcb_application::domain_services::search_service::{
    SearchService, SourceSearchConfig, TmdbExpansionConfig,
};
use mcb_application::domain_services::sync_coordinator::{
    EnrichmentConfig, SourceSyncConfig, SyncCoordinator,
};
use mcb_domain::error::{Error, Result};
use mcb_domain::ports::infrastructure::auth::AuthServiceInterface;
use mcb_domain::ports::infrastructure::sync_status::SyncStatusProvider;
use mcb_domain::ports::providers::{
    CatalogReader, EmbeddingClient, EnrichmentClient, EnrichmentStore, KeywordSearch, VectorStore,
};
use mcb_providers::catalog::PostgresCatalogReader;
use mcb_providers::embedding::{FallbackEmbeddingClient, FastEmbedClient, GpuEmbeddingClient};
use mcb_providers::enrichment::{MokaEnrichmentStore, TmdbEnrichmentClient, TpdbEnrichmentClient};
use mcb_providers::keyword_search::BitmagnetKeywordSearch;
use mcb_providers::vector_store::{EdgeVecConfig, EdgeVecVectorStore, HnswConfig, MilvusVectorStore, QdrantVectorStore};

use crate::auth::FileAuthService;
use crate::config::{AppConfig, VectorStoreKind};
use crate::sync_status::CatalogSyncStatusProvider;

/// Process-wide server context: every adapter selected by [`AppConfig`],
/// constructed once at startup and shared behind `Arc` by handlers and
/// background workers.
pub struct Server {
    /// The configuration this context was built from.
    pub config: AppConfig,
    /// Catalog reader, shared by search, sync, and the sync-status refresher.
    pub catalog: Arc<dyn CatalogReader>,
    /// Selected vector store backend.
    pub vector_store: Arc<dyn VectorStore>,
    /// Selected embedding client (remote, local, or fallback composite).
    pub embedder: Arc<dyn EmbeddingClient>,
    /// Bearer-token authentication.
    pub auth: Arc<dyn AuthServiceInterface>,
    /// Cached, periodically refreshed sync-status snapshot.
    pub sync_status: Arc<dyn SyncStatusProvider>,
    /// Same value as `sync_status`, kept concrete so the background
    /// refresher can be spawned (trait objects can't expose `spawn_refresher`).
    sync_status_refresher: Arc<CatalogSyncStatusProvider>,
    /// Hybrid semantic + keyword search orchestrator.
    pub search_service: Arc<SearchService>,
    /// Sync coordinator for sources with no enrichment configured.
    plain_sync: Arc<SyncCoordinator>,
    /// Sync coordinator for sources with TMDB enrichment enabled.
    tmdb_sync: Option<Arc<SyncCoordinator>>,
    /// Sync coordinator for sources with TPDB enrichment enabled.
    tpdb_sync: Option<Arc<SyncCoordinator>>,
    /// Per-source sync settings, keyed by source name.
    source_sync_configs: HashMap<String, SourceSyncConfig>,
    /// TMDB enrichment client, also reachable directly for `/tmdb_detail`'s
    /// live-enrich-on-miss path.
    pub tmdb_client: Option<Arc<dyn EnrichmentClient>>,
    /// Shared enrichment cache, reachable directly for the same reason.
    pub enrichment_store: Option<Arc<dyn EnrichmentStore>>,
}

impl Server {
    /// Build every adapter from `config` and assemble the context.
    /// Does not start the sync-status background refresher; call
    /// [`Server::spawn_background_tasks`] once the context is wrapped in `Arc`.
    pub async fn build(config: AppConfig) -> Result<Arc<Self>> {
        let catalog: Arc<dyn CatalogReader> = {
            let sources = config
                .sources
                .iter()
                .map(|s| (s.name.clone(), s.pg.to_catalog_config()))
                .collect();
            Arc::new(PostgresCatalogReader::new(&config.postgres.dsn, sources)?)
        };

        for source in &config.sources {
            catalog.ensure_tables(&source.name).await?;
        }

        let vector_store = build_vector_store(&config).await?;
        let embedder = build_embedder(&config)?;

        if embedder.dim() != vector_store.dim() {
            return Err(Error::configuration(format!(
                "embedding dimension {} does not match vector_store.dim {}",
                embedder.dim(),
                vector_store.dim()
            )));
        }

        let auth: Arc<dyn AuthServiceInterface> = Arc::new(FileAuthService::new(
            config.auth.enabled,
            config.auth.admin_user.clone(),
            config.auth.admin_password.clone(),
            config.auth.user_store_path.clone().into(),
            config.auth.token_ttl_seconds,
        ));

        let sync_status_refresher = Arc::new(CatalogSyncStatusProvider::new(
            Arc::clone(&catalog),
            config.sources.iter().map(|s| s.name.clone()).collect(),
        ));
        let sync_status: Arc<dyn SyncStatusProvider> = sync_status_refresher.clone();

        let enrichment_store: Option<Arc<dyn EnrichmentStore>> =
            if config.tmdb.enabled || config.tpdb.enabled {
                let hit_ttl_hours = if config.tpdb.enabled { config.tpdb.cache_ttl_hours } else { 24 * 30 };
                let miss_ttl_hours = if config.tpdb.enabled { config.tpdb.not_found_ttl_hours } else { 24 };
                Some(Arc::new(MokaEnrichmentStore::new(
                    Duration::from_secs(hit_ttl_hours * 3600),
                    Duration::from_secs(miss_ttl_hours * 3600),
                )))
            } else {
                None
            };

        let keyword_search: Option<Arc<dyn KeywordSearch>> = if config.bitmagnet.enabled {
            Some(Arc::new(BitmagnetKeywordSearch::new(
                config.bitmagnet.graphql_endpoint.clone(),
            )))
        } else {
            None
        };

        let tmdb_expansion = if config.tmdb.enabled && config.tmdb.query_expand {
            Some(TmdbExpansionConfig {
                schema: config.bitmagnet.schema.clone(),
                limit: config.tmdb.query_expand_limit,
            })
        } else {
            None
        };

        let search_sources: Vec<SourceSearchConfig> = config
            .sources
            .iter()
            .map(|s| SourceSearchConfig {
                name: s.name.clone(),
                keyword_search_enabled: s.pg.keyword_search,
            })
            .collect();

        let search_service = Arc::new(SearchService::new(
            Arc::clone(&catalog),
            Arc::clone(&embedder),
            Arc::clone(&vector_store),
            keyword_search,
            tmdb_expansion,
            search_sources,
        ));

        let tmdb_client: Option<Arc<dyn EnrichmentClient>> = if config.tmdb.enabled {
            let api_key = resolve_secret(config.tmdb.api_key.as_deref(), config.tmdb.api_key_env.as_deref());
            Some(Arc::new(
                TmdbEnrichmentClient::new(
                    api_key.unwrap_or_default(),
                    config.tmdb.language.clone(),
                    mcb_providers::enrichment::tmdb::TmdbLimits {
                        actors: config.tmdb.limits.actors,
                        directors: config.tmdb.limits.directors,
                        aka: config.tmdb.limits.aka,
                    },
                )
                .with_base_url(config.tmdb.base_url.clone()),
            ))
        } else {
            None
        };

        let tpdb_client: Option<Arc<dyn EnrichmentClient>> = if config.tpdb.enabled {
            let token = resolve_secret(config.tpdb.token.as_deref(), Some("TPDB_API_TOKEN"));
            let query = config.tpdb.queries.values().next().cloned().unwrap_or_default();
            let result_path = config.tpdb.result_paths.values().next().cloned();
            Some(Arc::new(
                TpdbEnrichmentClient::new(token.unwrap_or_default(), query, result_path)
                    .with_endpoint(config.tpdb.endpoint.clone())
                    .with_auth(config.tpdb.auth_header.clone(), config.tpdb.auth_prefix.clone()),
            ))
        } else {
            None
        };

        let plain_sync = Arc::new(SyncCoordinator::new(
            Arc::clone(&catalog),
            Arc::clone(&embedder),
            Arc::clone(&vector_store),
            enrichment_store.clone(),
            None,
        ));

        let tmdb_sync = tmdb_client.clone().map(|client| {
            Arc::new(SyncCoordinator::new(
                Arc::clone(&catalog),
                Arc::clone(&embedder),
                Arc::clone(&vector_store),
                enrichment_store.clone(),
                Some(client),
            ))
        });

        let tpdb_sync = tpdb_client.map(|client| {
            Arc::new(SyncCoordinator::new(
                Arc::clone(&catalog),
                Arc::clone(&embedder),
                Arc::clone(&vector_store),
                enrichment_store.clone(),
                Some(client),
            ))
        });

        let source_sync_configs = config
            .sources
            .iter()
            .map(|s| {
                let enrichment = source_enrichment_config(&config, s);
                (
                    s.name.clone(),
                    SourceSyncConfig {
                        name: s.name.clone(),
                        batch_size: s.sync.batch_size.unwrap_or(config.sync.batch_size),
                        concurrency: s.sync.concurrency.unwrap_or(config.sync.concurrency),
                        nsfw_threshold: config.nsfw_threshold,
                        enrichment,
                    },
                )
            })
            .collect();

        Ok(Arc::new(Self {
            config,
            catalog,
            vector_store,
            embedder,
            auth,
            sync_status,
            sync_status_refresher,
            search_service,
            plain_sync,
            tmdb_sync,
            tpdb_sync,
            source_sync_configs,
            tmdb_client,
            enrichment_store,
        }))
    }

    /// Start background tasks that outlive a single request: the
    /// sync-status snapshot refresher.
    pub fn spawn_background_tasks(self: &Arc<Self>) {
        self.sync_status_refresher.spawn_refresher(Duration::from_secs(30));
    }

    /// Sync one configured source to completion, dispatching to whichever
    /// coordinator matches its enrichment backend.
    pub async fn sync_source(&self, name: &str) -> Result<mcb_application::domain_services::sync_coordinator::SourceSyncSummary> {
        let cfg = self
            .source_sync_configs
            .get(name)
            .ok_or_else(|| Error::not_found(format!("unconfigured source '{name}'")))?;
        let source = self
            .config
            .sources
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::not_found(format!("unconfigured source '{name}'")))?;

        let coordinator = if source.pg.tmdb_enrich {
            self.tmdb_sync.as_ref().ok_or_else(|| {
                Error::configuration(format!(
                    "source '{name}' enables tmdb_enrich but tmdb.enabled is false"
                ))
            })?
        } else if source.pg.tpdb_enrich {
            self.tpdb_sync.as_ref().ok_or_else(|| {
                Error::configuration(format!(
                    "source '{name}' enables tpdb_enrich but tpdb.enabled is false"
                ))
            })?
        } else {
            &self.plain_sync
        };

        coordinator.sync_source(cfg).await
    }

    /// Every configured source name, for `sync --source` validation and the
    /// `sync` subcommand's "sync all" default.
    pub fn source_names(&self) -> Vec<String> {
        self.config.sources.iter().map(|s| s.name.clone()).collect()
    }
}

fn source_enrichment_config(
    config: &AppConfig,
    source: &crate::config::SourceConfig,
) -> Option<EnrichmentConfig> {
    if source.pg.tmdb_enrich && config.tmdb.enabled {
        Some(EnrichmentConfig {
            schema: "tmdb".to_string(),
            id_field: "tmdb_id".to_string(),
            type_field: Some("content_type".to_string()),
            max_per_batch: config.tmdb.max_per_batch,
            sleep: Duration::from_secs_f64(config.tmdb.sleep_seconds),
        })
    } else if source.pg.tpdb_enrich && config.tpdb.enabled {
        Some(EnrichmentConfig {
            schema: "tpdb".to_string(),
            id_field: "tpdb_id".to_string(),
            type_field: None,
            max_per_batch: config.tpdb.search_limit,
            sleep: Duration::ZERO,
        })
    } else {
        None
    }
}

fn resolve_secret(direct: Option<&str>, env_var: Option<&str>) -> Option<String> {
    direct
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| env_var.and_then(|name| std::env::var(name).ok()))
}

async fn build_vector_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>> {
    let vs = &config.vector_store;
    match vs.kind {
        VectorStoreKind::Local => {
            let edgevec_config = EdgeVecConfig {
                path: std::path::PathBuf::from(&vs.path),
                dimensions: vs.dim,
                hnsw: HnswConfig {
                    m: vs.m,
                    m0: vs.m * 2,
                    ef_construction: vs.ef_construction,
                    ef_search: vs.ef_search,
                },
                metric: vs.metric,
                max_elements: vs.max_elements,
            };
            Ok(Arc::new(EdgeVecVectorStore::open(edgevec_config).await?))
        }
        VectorStoreKind::Qdrant => {
            let url = vs.url.clone().ok_or_else(|| {
                Error::configuration("vector_store.url is required when type = \"qdrant\"")
            })?;
            Ok(Arc::new(
                QdrantVectorStore::connect(&url, vs.collection.clone(), vs.dim).await?,
            ))
        }
        VectorStoreKind::Milvus => {
            let address = vs.uri.clone().ok_or_else(|| {
                Error::configuration("vector_store.uri is required when type = \"milvus\"")
            })?;
            Ok(Arc::new(
                MilvusVectorStore::connect(&address, vs.collection.clone(), vs.dim).await?,
            ))
        }
    }
}

fn build_embedder(config: &AppConfig) -> Result<Arc<dyn EmbeddingClient>> {
    let remote = config.gpu_endpoint.as_ref().map(|endpoint| {
        Arc::new(GpuEmbeddingClient::new(
            endpoint.clone(),
            config.embedding_model_version.clone(),
            config.vector_store.dim,
        )) as Arc<dyn EmbeddingClient>
    });

    let local: Option<Arc<dyn EmbeddingClient>> = if config.local_embedder.enabled {
        Some(Arc::new(FastEmbedClient::new()?))
    } else {
        None
    };

    match (local, remote) {
        (Some(local), Some(remote)) => Ok(Arc::new(FallbackEmbeddingClient::new(local, remote)?)),
        (Some(local), None) => Ok(local),
        (None, Some(remote)) => Ok(remote),
        (None, None) => Err(Error::configuration(
            "either gpu_endpoint or local_embedder.enabled must be set",
        )),
    }
}

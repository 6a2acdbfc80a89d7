//! Domain Port Interfaces
//!
//! Defines all boundary contracts between domain and external layers.
//! Ports are organized by purpose, following the Dependency Inversion
//! Principle: high-level modules (domain, application) define interfaces;
//! low-level modules (providers, infrastructure) implement them.
//!
//! - **infrastructure/** - cross-cutting services (auth, sync-status)
//! - **providers/** - external service provider ports (vector store, embedding,
//!   catalog, enrichment, keyword search, cache)

/// Infrastructure service ports
pub mod infrastructure;
/// External service provider ports
pub mod providers;

pub use infrastructure::{
    AuthServiceInterface, Identity, SourceSyncStatus, SyncStatusProvider, SyncStatusSnapshot,
};
pub use providers::{
    CacheEntryConfig, CacheProvider, CacheProviderFactoryInterface, CacheStats, CatalogReader,
    EmbeddingBatch, EmbeddingClient, EnrichmentClient, EnrichmentQuery, EnrichmentRecord,
    EnrichmentStatus, EnrichmentStore, ExpansionToken, HydratedRow, KeywordHit, KeywordSearch,
    Metric, PendingRow, TorrentFile, VectorStore,
};

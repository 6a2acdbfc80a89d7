//! External Provider Ports
//!
//! Ports for external services the domain depends on but does not
//! implement: vector storage, embedding inference, the relational
//! catalog, third-party enrichment, keyword search, and caching.
//!
//! | Port | Description |
//! |------|-------------|
//! | [`VectorStore`] | Upsert/query a pluggable ANN backend |
//! | [`EmbeddingClient`] | Text -> vector + NSFW score |
//! | [`CatalogReader`] | Relational catalog access for sync + search hydration |
//! | [`EnrichmentStore`] | Cached third-party metadata (TMDB/TPDB) |
//! | [`KeywordSearch`] | Server-side keyword search (GraphQL backend) |
//! | [`CacheProvider`] | Generic TTL cache backend |

/// Cache provider port
pub mod cache;
/// Catalog reader port
pub mod catalog;
/// Embedding client port
pub mod embedding;
/// Enrichment store port
pub mod enrichment;
/// Keyword search port
pub mod keyword_search;
/// Vector store port
pub mod vector_store;

pub use cache::{CacheEntryConfig, CacheProvider, CacheProviderFactoryInterface, CacheStats};
pub use catalog::{CatalogReader, ExpansionToken, HydratedRow, PendingRow, TorrentFile};
pub use embedding::{EmbeddingBatch, EmbeddingClient};
pub use enrichment::{
    EnrichmentClient, EnrichmentQuery, EnrichmentRecord, EnrichmentStatus, EnrichmentStore,
};
pub use keyword_search::{KeywordHit, KeywordSearch};
pub use vector_store::{Metric, VectorStore};

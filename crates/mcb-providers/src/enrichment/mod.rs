//! Enrichment store and upstream client implementations.

/// Moka-backed two-tier TTL cache for [`EnrichmentRecord`]s.
pub mod store;
/// TMDB HTTP enrichment client.
pub mod tmdb;
/// TPDB GraphQL enrichment client.
pub mod tpdb;

pub use store::MokaEnrichmentStore;
pub use tmdb::TmdbEnrichmentClient;
pub use tpdb::TpdbEnrichmentClient;

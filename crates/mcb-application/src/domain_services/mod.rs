//! Orchestration and pure-logic services sitting above the `mcb-domain` ports.

mod dictionaries;
pub mod keyword_scoring;
pub mod query_rewriter;
pub mod search_service;
pub mod sync_coordinator;
pub mod text_normalizer;

pub use query_rewriter::{rewrite, rewrite_with_expansions, RewrittenQuery};
pub use search_service::{SearchQuery, SearchService, SourceSearchConfig, TmdbExpansionConfig};
pub use sync_coordinator::{EnrichmentConfig, SourceSyncConfig, SourceSyncSummary, SyncCoordinator};

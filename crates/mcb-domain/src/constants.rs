//! Domain layer constants
//!
//! Constants that are part of the domain logic itself and used across the
//! application layer. Deployment-specific knobs (ports, paths, timeouts)
//! belong in configuration, not here.

/// Default size of a sync batch when a source doesn't override it.
pub const DEFAULT_SYNC_BATCH_SIZE: usize = 128;

/// Default number of concurrent batch workers per source.
pub const DEFAULT_SYNC_CONCURRENCY: usize = 1;

/// Upper bound on `fetch_k` passed to the vector store regardless of requested topk/page_size.
pub const MAX_FETCH_K: usize = 100;

/// Default number of results per search page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Maximum allowed `topk` / `page_size` on search endpoints.
pub const MAX_PAGE_SIZE: usize = 100;

/// Floor applied to the keyword substring-match score.
pub const KEYWORD_PARTIAL_MATCH_FLOOR: f32 = 0.2;

/// Score assigned when a keyword query has no match at all.
pub const KEYWORD_NO_MATCH_SCORE: f32 = 0.1;

/// Score assigned to an exact keyword match.
pub const KEYWORD_EXACT_MATCH_SCORE: f32 = 1.0;

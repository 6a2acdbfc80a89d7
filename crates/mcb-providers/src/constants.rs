//! Provider Constants
//!
//! Constants specific to provider implementations. These are separated from
//! domain constants (which live in mcb-domain) and infrastructure constants.

// ============================================================================
// EMBEDDING PROVIDER CONSTANTS
// ============================================================================

/// FastEmbed default dimension (all-MiniLM-L6-v2)
pub const EMBEDDING_DIMENSION_FASTEMBED_DEFAULT: usize = 384;

// ============================================================================
// CACHE PROVIDER CONSTANTS
// ============================================================================

/// Default cache TTL in seconds (1 hour)
pub const CACHE_DEFAULT_TTL_SECS: u64 = 3600;

/// Default cache size limit in bytes (100MB)
pub const CACHE_DEFAULT_SIZE_LIMIT: usize = 100 * 1024 * 1024;

/// Cache namespace separator
pub const CACHE_NAMESPACE_SEPARATOR: &str = ":";

// ============================================================================
// HTTP CONSTANTS
// ============================================================================

/// JSON content type
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// HTTP request timeout in seconds (for embedding and enrichment API calls)
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client maximum idle connections per host
pub const HTTP_MAX_IDLE_PER_HOST: usize = 10;

/// HTTP client idle connection timeout in seconds
pub const HTTP_CLIENT_IDLE_TIMEOUT_SECS: u64 = 90;

/// HTTP TCP keep-alive interval in seconds
pub const HTTP_KEEPALIVE_SECS: u64 = 60;

// ============================================================================
// EDGEVEC VECTOR STORE CONSTANTS
// ============================================================================

/// EdgeVec HNSW M parameter (max connections per node in layers > 0)
pub const EDGEVEC_HNSW_M: u32 = 16;

/// EdgeVec HNSW M0 parameter (max connections per node in layer 0)
pub const EDGEVEC_HNSW_M0: u32 = 32;

/// EdgeVec HNSW ef_construction parameter
pub const EDGEVEC_HNSW_EF_CONSTRUCTION: u32 = 200;

/// EdgeVec HNSW ef_search parameter
pub const EDGEVEC_HNSW_EF_SEARCH: u32 = 64;

/// EdgeVec default dimensions
pub const EDGEVEC_DEFAULT_DIMENSIONS: usize = 1536;

// ============================================================================
// MILVUS VECTOR STORE CONSTANTS
// ============================================================================

/// Milvus field varchar max length
pub const MILVUS_FIELD_VARCHAR_MAX_LENGTH: i32 = 512;

/// Milvus metadata varchar max length
pub const MILVUS_METADATA_VARCHAR_MAX_LENGTH: i32 = 65535;

/// Milvus IvfFlat nlist parameter
pub const MILVUS_IVFFLAT_NLIST: u32 = 128;

/// Milvus default port
pub const MILVUS_DEFAULT_PORT: u16 = 19530;

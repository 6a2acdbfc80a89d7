//! Infrastructure layer constants
//!
//! Contains constants that are part of the infrastructure implementation.
//! Domain-specific constants are defined in `mcb_domain::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "mcb.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "mcb";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "MCB";

// ============================================================================
// AUTHENTICATION CONSTANTS
// ============================================================================

/// Authorization header name
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Bearer token prefix
pub const BEARER_PREFIX: &str = "Bearer ";

/// Default bearer token TTL in seconds (24 hours)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 86400;

/// Length in bytes of a generated token/salt (hex-encoded, so twice this many characters)
pub const TOKEN_BYTES: usize = 24;
/// Length in bytes of a generated password salt
pub const SALT_BYTES: usize = 8;

// ============================================================================
// DATABASE CONSTANTS
// ============================================================================

/// Default database connection pool size
pub const DB_POOL_SIZE: u32 = 8;

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Re-export domain constants for convenience
pub use mcb_domain::constants::*;

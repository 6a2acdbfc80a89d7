//! Cache Provider Implementations
//!
//! ## Available Providers
//!
//! | Provider | Type | Description |
//! |----------|------|-------------|
//! | [`MokaCacheProvider`] | Local | In-memory cache (high performance) |

#[cfg(feature = "cache-moka")]
pub mod moka;

#[cfg(feature = "cache-moka")]
pub use moka::{MokaCacheProvider, MokaCacheProviderFactory};

// Re-export domain types used by cache providers
pub use mcb_domain::ports::providers::{CacheEntryConfig, CacheStats};

// Allow collapsible_if for complex conditional logic
#![allow(clippy::collapsible_if)]

//! # Provider Implementations
//!
//! Concrete adapters for every external-service port defined in
//! `mcb-domain`. Each provider implements a port (trait); the wiring that
//! selects which one to use for a given deployment lives in
//! `mcb-infrastructure`.
//!
//! ## Provider Categories
//!
//! | Category | Port | Implementations |
//! |----------|------|-----------------|
//! | Embedding | `EmbeddingClient` | GPU inference service, FastEmbed (local), local-then-remote fallback |
//! | Vector Store | `VectorStore` | EdgeVec (local HNSW), Qdrant (cluster A), Milvus (cluster B) |
//! | Cache | `CacheProvider` | Moka |
//!
//! ## Feature Flags
//!
//! Each provider can be enabled/disabled via feature flags for minimal builds:
//!
//! ```toml
//! [dependencies]
//! mcb-providers = { version = "0.1", default-features = false, features = ["vectorstore-edgevec", "cache-moka"] }
//! ```

// Re-export mcb-domain types commonly used with providers
pub use mcb_domain::error::{Error, Result};
pub use mcb_domain::ports::providers::{
    CacheProvider, CacheProviderFactoryInterface, EmbeddingClient, KeywordSearch, VectorStore,
};

/// Provider-specific constants
pub mod constants;

/// Shared utilities for provider implementations
pub mod utils;

/// Embedding client implementations
pub mod embedding;

/// Vector store implementations
pub mod vector_store;

/// Relational catalog reader implementations
#[cfg(feature = "catalog-postgres")]
pub mod catalog;

/// Enrichment store/client implementations
#[cfg(feature = "cache-moka")]
pub mod enrichment;

/// Keyword search implementations
pub mod keyword_search;

/// Cache provider implementations
pub mod cache;

/// HTTP client abstractions
///
/// Provides the `HttpClientProvider` trait and configuration for API-based
/// providers; the concrete client is constructed by each adapter or injected
/// by `mcb-infrastructure`.
pub mod http;

/// Bounded retry for transient upstream failures, shared across every
/// HTTP-backed adapter in this crate.
pub mod retry;

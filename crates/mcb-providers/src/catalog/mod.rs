//! Catalog reader implementations.

/// Postgres-backed catalog reader.
pub mod postgres;

pub use postgres::{AggKind, JoinConfig, JoinField, JoinType, PostgresCatalogReader, SourceCatalogConfig};

//! Application Layer - Catalog Search
//!
//! Orchestrates the sync and search pipelines on top of the port traits
//! defined in `mcb-domain`. Pure logic plus coordination: no catalog, vector
//! store, or embedding I/O happens anywhere but behind those ports.
//!
//! ## Domain Services
//!
//! - [`domain_services::sync_coordinator`]: catalog -> enrichment -> embed ->
//!   vector store sync pipeline, one source at a time with a bounded worker pool.
//! - [`domain_services::search_service`]: query rewrite -> vector search ->
//!   catalog hydration -> dedupe/sort/paginate.
//! - [`domain_services::query_rewriter`]: turns raw query text into an
//!   embedding string, a metadata filter, and a cleaned keyword query.
//! - [`domain_services::text_normalizer`]: release-noise stripping and
//!   file-type/language/genre tag detection shared by both pipelines.
//! - [`domain_services::keyword_scoring`]: substring-position scoring for
//!   keyword search hits.
//!
//! ## Dependencies
//!
//! This crate depends only on `mcb-domain` for port traits and value
//! objects, plus pure Rust libraries for async, serialization, and text
//! processing. No infrastructure or framework dependencies.

pub mod domain_services;

pub use domain_services::*;

//! Domain layer: core business types and port interfaces for the catalog
//! search system.
//!
//! This crate has no knowledge of Postgres, HTTP, or any concrete
//! provider — it defines what the system *is* (value objects) and what it
//! *needs* (ports), leaving how those needs are met to `mcb-providers` and
//! `mcb-infrastructure`.

/// Domain-level constants shared with the application layer.
pub mod constants;
/// The shared error type and `Result` alias.
pub mod error;
/// Boundary contracts between domain and external layers.
pub mod ports;
/// Immutable domain value objects.
pub mod value_objects;

pub use error::{Error, Result};

//! Server-side keyword search implementations.

/// Bitmagnet GraphQL keyword search.
pub mod bitmagnet;

pub use bitmagnet::BitmagnetKeywordSearch;

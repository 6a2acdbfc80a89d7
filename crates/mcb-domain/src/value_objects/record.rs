//! Value Object: RecordId
//!
//! Identifies a single catalog row across the whole system. A record
//! is never identified by the vector store's own id scheme; everything
//! keys off `(source, pg_id)` so that re-embedding a row is a pure
//! replace rather than a new identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of an indexable catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    /// Short, configured source tag (e.g. "movies", "torrents").
    pub source: String,
    /// Catalog primary key rendered as text (bytea columns render as `\xHEX`).
    pub pg_id: String,
}

impl RecordId {
    /// Build a new record identity.
    pub fn new(source: impl Into<String>, pg_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            pg_id: pg_id.into(),
        }
    }

    /// The `source:pg_id` composite key used as a dedup fallback and as the
    /// raw input to the stable vector id derivation.
    pub fn composite_key(&self) -> String {
        format!("{}:{}", self.source, self.pg_id)
    }

    /// Deterministic vector-store id: `uuidv5(NAMESPACE_URL, "source:pg_id")`.
    ///
    /// Stable across re-insertions so that replacing a vector for the same
    /// record never orphans the previous point/label.
    pub fn vector_id(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, self.composite_key().as_bytes())
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.composite_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_id_is_stable_across_instances() {
        let a = RecordId::new("movies", "42");
        let b = RecordId::new("movies", "42");
        assert_eq!(a.vector_id(), b.vector_id());
    }

    #[test]
    fn vector_id_differs_by_source() {
        let a = RecordId::new("movies", "42");
        let b = RecordId::new("torrents", "42");
        assert_ne!(a.vector_id(), b.vector_id());
    }

    #[test]
    fn composite_key_roundtrips_into_display() {
        let id = RecordId::new("movies", "42");
        assert_eq!(id.to_string(), "movies:42");
    }
}

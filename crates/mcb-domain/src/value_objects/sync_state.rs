//! Value Object: SyncState
//!
//! Per-record bookkeeping used to decide whether a catalog row needs
//! re-embedding, and to surface sync progress/failures on `/sync_status`.

use crate::value_objects::record::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sync bookkeeping for a single catalog row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    /// Stable catalog identity.
    pub id: RecordId,
    /// md5 hex digest of the text at last successful embed.
    pub text_hash: String,
    /// Embedding model version tag at last successful embed.
    pub embedding_version: String,
    /// Vector store id the record currently occupies.
    pub vector_id: String,
    /// NSFW score recorded at last successful embed.
    pub nsfw_score: f32,
    /// Timestamp of last successful sync.
    pub updated_at: DateTime<Utc>,
    /// Last error message, truncated to 512 chars; `None` if last run succeeded.
    pub last_error: Option<String>,
}

/// Maximum length of a persisted sync-state error message.
pub const MAX_ERROR_MESSAGE_LEN: usize = 512;

impl SyncState {
    /// Truncate an error message to the persisted limit, respecting char boundaries.
    pub fn truncate_error(message: &str) -> String {
        if message.len() <= MAX_ERROR_MESSAGE_LEN {
            return message.to_string();
        }
        let mut end = MAX_ERROR_MESSAGE_LEN;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message[..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_error_respects_limit() {
        let long = "x".repeat(1000);
        let truncated = SyncState::truncate_error(&long);
        assert_eq!(truncated.len(), MAX_ERROR_MESSAGE_LEN);
    }

    #[test]
    fn truncate_error_is_noop_under_limit() {
        let short = "boom";
        assert_eq!(SyncState::truncate_error(short), "boom");
    }
}

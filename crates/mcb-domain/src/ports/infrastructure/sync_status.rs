//! Sync-Status Snapshot Port
//!
//! `/sync_status` is served from a periodically refreshed snapshot rather
//! than hitting the catalog on every request; a background refresher
//! writes under a write lock while handlers read under a read lock.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shaku::Interface;
use std::collections::HashMap;

/// Per-source sync counters surfaced on `/sync_status`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceSyncStatus {
    /// Total rows with a sync-state entry.
    pub synced: u64,
    /// Rows whose last attempt recorded an error.
    pub failed: u64,
    /// Most recent `updated_at` across sync-state rows, when any exist.
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// A point-in-time view of sync progress across all configured sources.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SyncStatusSnapshot {
    /// Per-source counters.
    pub sources: HashMap<String, SourceSyncStatus>,
    /// When this snapshot was computed.
    pub computed_at: Option<DateTime<Utc>>,
}

/// Read/refresh access to the sync-status snapshot cache.
#[async_trait]
pub trait SyncStatusProvider: Interface + Send + Sync {
    /// Current snapshot (read lock).
    async fn current(&self) -> SyncStatusSnapshot;

    /// Recompute and install a new snapshot (write lock).
    async fn refresh(&self) -> Result<()>;
}

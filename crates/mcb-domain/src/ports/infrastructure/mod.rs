//! Infrastructure Service Ports
//!
//! Cross-cutting services the application layer depends on that aren't
//! external data providers: authentication and the sync-status snapshot
//! cache.

/// Authentication service port
pub mod auth;
/// Sync-status snapshot port
pub mod sync_status;

pub use auth::{AuthServiceInterface, Identity};
pub use sync_status::{SourceSyncStatus, SyncStatusProvider, SyncStatusSnapshot};

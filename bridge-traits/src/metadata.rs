//! Sync Metadata Persistence Abstraction
//!
//! Stores last-successful-sync timestamps keyed by operation identity, so a
//! session can resume with an incremental fetch instead of a full snapshot
//! after a restart.
//!
//! Callers are expected to tolerate failures on both sides: a failed read is
//! treated as "never synced", and a failed write leaves the in-memory value
//! authoritative until the next attempt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Persistent store for per-operation sync watermarks.
///
/// # Platform Support
///
/// - **Desktop**: settings database or a small key-value file
/// - **iOS/Android**: user defaults / shared preferences
/// - **Web**: localStorage
#[async_trait]
pub trait SyncMetadataStore: Send + Sync {
    /// Last time a delta-producing event was observed for this operation.
    async fn last_sync_time(&self, id: &str) -> Result<Option<DateTime<Utc>>>;

    /// Last time a network snapshot fetch completed for this operation.
    async fn last_snapshot_time(&self, id: &str) -> Result<Option<DateTime<Utc>>>;

    async fn set_last_sync_time(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    async fn set_last_snapshot_time(&self, id: &str, at: DateTime<Utc>) -> Result<()>;
}

//! Sync watermark tracking and persistence.
//!
//! The watermark is the timestamp below which the client asserts it has
//! observed all remote changes. It advances on every update-producing event:
//! a successful network snapshot fetch, a successful delta fetch, and each
//! applied subscription message.
//!
//! The in-memory value is authoritative. Persistence to the
//! [`SyncMetadataStore`] is best-effort through a dedicated single-writer
//! task, so status reads and watermark updates never wait on the potentially
//! slow store, and a store failure costs nothing but an extra overlap on the
//! next restart.

use std::sync::Arc;

use bridge_traits::metadata::SyncMetadataStore;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::identity::OperationIdentity;

/// Fixed skew subtracted from every recorded event time, in seconds.
///
/// Recording slightly behind the observed completion time re-requests a small
/// overlap window on the next delta fetch, trading a few duplicate deliveries
/// for zero missed updates under client/server clock drift.
pub const WATERMARK_SKEW_SECS: i64 = 2;

/// In-memory watermark state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncWatermark {
    /// Most recent update-producing event time (skew applied).
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Most recent network snapshot fetch time (skew applied).
    pub last_snapshot_fetch_time: Option<DateTime<Utc>>,
}

enum PersistCommand {
    SyncTime(DateTime<Utc>),
    SnapshotFetchTime(DateTime<Utc>),
}

/// Serialized watermark state for one operation identity.
pub struct WatermarkStore {
    state: Mutex<SyncWatermark>,
    writer: mpsc::UnboundedSender<PersistCommand>,
}

impl WatermarkStore {
    /// Load persisted watermarks and spawn the persistence writer.
    ///
    /// A failed read leaves the corresponding value unset, which downstream
    /// logic treats as "never synced".
    pub async fn load(identity: OperationIdentity, store: Arc<dyn SyncMetadataStore>) -> Arc<Self> {
        let last_sync_time = match store.last_sync_time(identity.as_str()).await {
            Ok(value) => value,
            Err(error) => {
                warn!(%identity, "failed to read last sync time: {error}");
                None
            }
        };
        let last_snapshot_fetch_time = match store.last_snapshot_time(identity.as_str()).await {
            Ok(value) => value,
            Err(error) => {
                warn!(%identity, "failed to read last snapshot fetch time: {error}");
                None
            }
        };

        let (writer, commands) = mpsc::unbounded_channel();
        tokio::spawn(persist_loop(identity, store, commands));

        Arc::new(Self {
            state: Mutex::new(SyncWatermark {
                last_sync_time,
                last_snapshot_fetch_time,
            }),
            writer,
        })
    }

    /// Current watermark values.
    pub fn snapshot(&self) -> SyncWatermark {
        *self.state.lock()
    }

    /// Record an update-producing event observed at `at`.
    ///
    /// The stored value is `at` minus the fixed skew, and never moves
    /// backwards. Returns the effective last-sync time after the update.
    pub fn record_sync_event(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let skewed = at - Duration::seconds(WATERMARK_SKEW_SECS);
        let mut state = self.state.lock();
        if state.last_sync_time.is_none_or(|current| skewed > current) {
            state.last_sync_time = Some(skewed);
            let _ = self.writer.send(PersistCommand::SyncTime(skewed));
        }
        state.last_sync_time.unwrap_or(skewed)
    }

    /// Record a successful network snapshot fetch completed at `at`.
    ///
    /// A fresh snapshot subsumes every delta up to its completion, so this
    /// advances both the snapshot fetch time and the sync watermark.
    pub fn record_snapshot_fetch(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let skewed = at - Duration::seconds(WATERMARK_SKEW_SECS);
        {
            let mut state = self.state.lock();
            if state
                .last_snapshot_fetch_time
                .is_none_or(|current| skewed > current)
            {
                state.last_snapshot_fetch_time = Some(skewed);
                let _ = self.writer.send(PersistCommand::SnapshotFetchTime(skewed));
            }
        }
        self.record_sync_event(at)
    }
}

/// Single-writer persistence loop. Exits when the owning store is dropped.
async fn persist_loop(
    identity: OperationIdentity,
    store: Arc<dyn SyncMetadataStore>,
    mut commands: mpsc::UnboundedReceiver<PersistCommand>,
) {
    while let Some(command) = commands.recv().await {
        let result = match command {
            PersistCommand::SyncTime(at) => store.set_last_sync_time(identity.as_str(), at).await,
            PersistCommand::SnapshotFetchTime(at) => {
                store.set_last_snapshot_time(identity.as_str(), at).await
            }
        };
        if let Err(error) = result {
            // In-memory state stays authoritative; nothing to roll back.
            warn!(%identity, "watermark persistence failed: {error}");
        } else {
            debug!(%identity, "watermark persisted");
        }
    }
}

//! # Delta Synchronization Module
//!
//! Keeps a local data cache consistent with a remote data source by
//! combining three complementary update channels: an initial snapshot query,
//! a live push subscription, and a periodic incremental (delta) query.
//!
//! ## Overview
//!
//! The engine guarantees exactly the right amount of replay: no missed
//! update, no double-apply, and no update applied out of order relative to
//! the snapshot it depends on, while tolerating network loss, backgrounding,
//! and concurrent update arrival.
//!
//! ## Components
//!
//! - **Operation Identity** (`identity`): stable key for persisted sync metadata
//! - **Watermark Store** (`watermark`): skewed, monotonic last-sync tracking
//!   with best-effort persistence
//! - **Message Buffer** (`buffer`): ordered replay of subscription traffic
//!   that arrives mid-cycle
//! - **Poll Scheduler** (`scheduler`): re-armable one-shot timer bounding staleness
//! - **Subscription Manager** (`subscription`): push channel lifecycle and routing
//! - **Sync Orchestrator** (`orchestrator`): the serialized cycle state machine
//! - **Delta Sync Session** (`session`): public facade with cancellation

pub mod buffer;
pub mod callbacks;
pub mod config;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod scheduler;
pub mod session;
pub mod subscription;
pub mod watermark;

pub use buffer::{BufferedMessage, MessageBuffer};
pub use callbacks::{
    DeltaCallback, DeltaOutcome, MessageOutcome, MessageResultCallback, SessionStatus,
    SnapshotCallback, SnapshotOutcome, StatusCallback,
};
pub use config::{SyncConfiguration, DEFAULT_POLL_INTERVAL_SECS};
pub use error::{Result, SyncError};
pub use identity::OperationIdentity;
pub use orchestrator::{SessionState, DELTA_SINCE_VARIABLE};
pub use scheduler::PollScheduler;
pub use session::{
    DeltaOperation, DeltaSyncSession, SnapshotOperation, SubscriptionOperation, SyncOperations,
    SyncPlatform,
};
pub use subscription::ConnectionState;
pub use watermark::{SyncWatermark, WatermarkStore, WATERMARK_SKEW_SECS};

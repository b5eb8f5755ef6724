//! # Host Bridge Traits
//!
//! Collaborator abstraction traits that must be implemented by each host
//! platform before a sync session can run.
//!
//! ## Overview
//!
//! This crate defines the contract between the sync engine and everything it
//! treats as external: query execution, the subscription transport, sync
//! metadata persistence, reachability, and lifecycle notifications. Each
//! trait represents a capability the engine requires but that must be
//! implemented differently per platform (desktop, iOS, Android, web).
//!
//! ## Traits
//!
//! ### Data Channels
//! - [`QueryExecutor`](query::QueryExecutor) - Snapshot and delta fetches,
//!   including response parsing and record publication
//! - [`SubscriptionExecutor`](subscription::SubscriptionExecutor) - The live
//!   push channel
//!
//! ### Persistence
//! - [`SyncMetadataStore`](metadata::SyncMetadataStore) - Last-sync
//!   timestamps keyed by operation identity
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity transitions
//! - [`LifecycleObserver`](lifecycle::LifecycleObserver) - Foreground /
//!   background transitions
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert platform-specific failures into the
//! matching variant and provide actionable messages; the engine decides per
//! call site whether a failure is swallowed, retried, or fatal.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks.

pub mod error;
pub mod lifecycle;
pub mod metadata;
pub mod network;
pub mod query;
pub mod subscription;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use lifecycle::{LifecycleChangeStream, LifecycleObserver, LifecycleState};
pub use metadata::SyncMetadataStore;
pub use network::{NetworkChangeStream, NetworkMonitor, NetworkStatus};
pub use query::{
    CachePolicy, CacheTransactionId, DeltaResponse, QueryError, QueryExecutor, QueryRequest,
    QueryResponse,
};
pub use subscription::{
    ConnectCallback, MessageCallback, SubscriptionError, SubscriptionExecutor, SubscriptionHandle,
    SubscriptionMessage, SubscriptionRequest,
};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};

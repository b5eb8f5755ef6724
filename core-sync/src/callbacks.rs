//! Consumer-facing callback surface.
//!
//! The session reports results through per-operation callbacks and a status
//! callback. Result and error are carried side by side because the remote
//! source can return partial data alongside application errors; a callback
//! receiving both should treat the data as authoritative and the errors as
//! advisory.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bridge_traits::query::{CacheTransactionId, QueryResponse};
use bridge_traits::subscription::SubscriptionError;
use core_runtime::events::{CoreEvent, EventBus};
use serde_json::Value;

use crate::error::SyncError;

/// Session status reported through the status callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// The session is connected and cycles are completing.
    Active,
    /// The push channel went down or could not connect; the next cycle
    /// retries. Not an error.
    Interrupted,
    /// The session hit an unrecoverable, non-terminal-channel condition.
    Failed { message: String },
    /// The session terminated and will run no further cycles.
    Terminated { message: String },
    /// The session was cancelled by the user.
    Cancelled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Interrupted => write!(f, "interrupted"),
            SessionStatus::Failed { message } => write!(f, "failed: {}", message),
            SessionStatus::Terminated { message } => write!(f, "terminated: {}", message),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of a snapshot fetch (cache-only or network).
#[derive(Debug)]
pub struct SnapshotOutcome {
    pub response: Option<QueryResponse>,
    pub error: Option<SyncError>,
}

impl SnapshotOutcome {
    pub fn success(response: QueryResponse) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    pub fn failure(error: SyncError) -> Self {
        Self {
            response: None,
            error: Some(error),
        }
    }
}

/// Outcome of a delta fetch.
#[derive(Debug)]
pub struct DeltaOutcome {
    pub response: Option<QueryResponse>,
    pub transaction: Option<CacheTransactionId>,
    pub error: Option<SyncError>,
}

impl DeltaOutcome {
    pub fn success(response: QueryResponse, transaction: Option<CacheTransactionId>) -> Self {
        Self {
            response: Some(response),
            transaction,
            error: None,
        }
    }

    pub fn failure(error: SyncError) -> Self {
        Self {
            response: None,
            transaction: None,
            error: Some(error),
        }
    }
}

/// Outcome of one subscription message delivery.
#[derive(Debug)]
pub struct MessageOutcome {
    pub payload: Option<Value>,
    pub transaction: Option<CacheTransactionId>,
    pub error: Option<SubscriptionError>,
}

pub type StatusCallback = Arc<dyn Fn(SessionStatus) + Send + Sync>;
pub type SnapshotCallback = Arc<dyn Fn(SnapshotOutcome) + Send + Sync>;
pub type DeltaCallback = Arc<dyn Fn(DeltaOutcome) + Send + Sync>;
pub type MessageResultCallback = Arc<dyn Fn(MessageOutcome) + Send + Sync>;

/// Cancel-aware fan-out of the consumer callbacks.
///
/// Once the session is cancelled every delivery except the single `Cancelled`
/// status is dropped, so results from in-flight operations are swallowed
/// instead of surfacing after the fact.
pub(crate) struct SessionCallbacks {
    cancelled: AtomicBool,
    on_status: StatusCallback,
    on_snapshot: Option<SnapshotCallback>,
    on_delta: Option<DeltaCallback>,
    on_message: Option<MessageResultCallback>,
    event_bus: EventBus,
}

impl SessionCallbacks {
    pub(crate) fn new(
        on_status: StatusCallback,
        on_snapshot: Option<SnapshotCallback>,
        on_delta: Option<DeltaCallback>,
        on_message: Option<MessageResultCallback>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            on_status,
            on_snapshot,
            on_delta,
            on_message,
            event_bus,
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Flip the cancelled flag. Emits the `Cancelled` status on the first
    /// call only and reports whether this call was the first.
    pub(crate) fn mark_cancelled(&self) -> bool {
        let first = !self.cancelled.swap(true, Ordering::SeqCst);
        if first {
            (self.on_status)(SessionStatus::Cancelled);
        }
        first
    }

    pub(crate) fn status(&self, status: SessionStatus) {
        if self.is_cancelled() {
            return;
        }
        (self.on_status)(status);
    }

    pub(crate) fn snapshot(&self, outcome: SnapshotOutcome) {
        if self.is_cancelled() {
            return;
        }
        if let Some(callback) = &self.on_snapshot {
            callback(outcome);
        }
    }

    pub(crate) fn delta(&self, outcome: DeltaOutcome) {
        if self.is_cancelled() {
            return;
        }
        if let Some(callback) = &self.on_delta {
            callback(outcome);
        }
    }

    pub(crate) fn message(&self, outcome: MessageOutcome) {
        if self.is_cancelled() {
            return;
        }
        if let Some(callback) = &self.on_message {
            callback(outcome);
        }
    }

    pub(crate) fn emit_event(&self, event: CoreEvent) {
        if self.is_cancelled() {
            return;
        }
        let _ = self.event_bus.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_hooks() -> (Arc<SessionCallbacks>, Arc<Mutex<Vec<SessionStatus>>>) {
        let statuses: Arc<Mutex<Vec<SessionStatus>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        let hooks = Arc::new(SessionCallbacks::new(
            Arc::new(move |status| sink.lock().unwrap().push(status)),
            None,
            None,
            None,
            EventBus::default(),
        ));
        (hooks, statuses)
    }

    #[test]
    fn test_mark_cancelled_emits_exactly_once() {
        let (hooks, statuses) = recording_hooks();

        assert!(hooks.mark_cancelled());
        assert!(!hooks.mark_cancelled());

        let recorded = statuses.lock().unwrap();
        assert_eq!(recorded.as_slice(), &[SessionStatus::Cancelled]);
    }

    #[test]
    fn test_status_suppressed_after_cancel() {
        let (hooks, statuses) = recording_hooks();

        hooks.mark_cancelled();
        hooks.status(SessionStatus::Active);
        hooks.status(SessionStatus::Interrupted);

        let recorded = statuses.lock().unwrap();
        assert_eq!(recorded.as_slice(), &[SessionStatus::Cancelled]);
    }
}

//! # Event Bus System
//!
//! Diagnostic event broadcasting for the sync core, built on
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The engine emits typed events as it works: cycle lifecycle, subscription
//! channel transitions, watermark movement. Tooling and tests subscribe to
//! observe the engine without interfering with it; consumer-facing results
//! are delivered through the session callbacks, never through the bus.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::CycleStarted {
//!         trigger: "timer".to_string(),
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Sync cycle started");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! `emit` fails only when no subscriber exists; emitters treat that as
//! normal (`.ok()`). Subscribers that fall behind receive
//! `RecvError::Lagged` and can simply continue.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Sync cycle events
    Sync(SyncEvent),
    /// Push channel events
    Subscription(SubscriptionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Subscription(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::CycleFailed {
                recoverable: false, ..
            }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::CycleFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Subscription(SubscriptionEvent::Interrupted { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Sync(SyncEvent::CycleCompleted { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Cancelled) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events describing sync cycle execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A cycle began executing on the serialized worker.
    CycleStarted {
        /// What enqueued the cycle ("initial", "timer", "foreground", "network").
        trigger: String,
    },
    /// A cycle ran to completion.
    CycleCompleted {
        /// Whether a network snapshot fetch ran this cycle.
        snapshot_fetched: bool,
        /// Whether a delta fetch ran this cycle.
        delta_fetched: bool,
        /// Buffered subscription messages applied after the cycle.
        messages_replayed: u64,
        /// Buffered messages whose individual apply failed.
        messages_failed: u64,
    },
    /// A cycle aborted early.
    CycleFailed {
        /// Human-readable failure description.
        message: String,
        /// Whether the next scheduled cycle will retry.
        recoverable: bool,
    },
    /// The sync watermark moved forward.
    WatermarkAdvanced {
        /// New last-sync time (Unix epoch seconds, skew already applied).
        last_sync_time: i64,
    },
    /// The session was cancelled by the user.
    Cancelled,
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::CycleStarted { .. } => "Sync cycle started",
            SyncEvent::CycleCompleted { .. } => "Sync cycle completed",
            SyncEvent::CycleFailed { .. } => "Sync cycle failed",
            SyncEvent::WatermarkAdvanced { .. } => "Sync watermark advanced",
            SyncEvent::Cancelled => "Sync session cancelled",
        }
    }
}

// ============================================================================
// Subscription Events
// ============================================================================

/// Events describing the live push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SubscriptionEvent {
    /// The channel connected (or reconnected).
    Connected,
    /// The channel was interrupted; the next cycle will reconnect.
    Interrupted {
        /// Why the channel went down.
        reason: String,
    },
}

impl SubscriptionEvent {
    fn description(&self) -> &str {
        match self {
            SubscriptionEvent::Connected => "Subscription connected",
            SubscriptionEvent::Interrupted { .. } => "Subscription interrupted",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for diagnostic events.
///
/// Cloning is cheap and shares the underlying channel. Each subscriber
/// receives every event emitted after it subscribed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall behind by more than `capacity` events receive
    /// `RecvError::Lagged` and keep going.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber receiving all future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

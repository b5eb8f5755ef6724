//! Subscription session management.
//!
//! Owns the lifecycle of the live push connection: (re)connect, forced
//! termination detection, and routing of incoming messages either into the
//! message buffer (while a cycle is in flight) or straight to the consumer.

use std::sync::Arc;

use bridge_traits::subscription::{
    ConnectCallback, MessageCallback, SubscriptionExecutor, SubscriptionHandle,
    SubscriptionMessage, SubscriptionRequest,
};
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_runtime::events::{CoreEvent, SubscriptionEvent};
use parking_lot::Mutex;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use crate::buffer::MessageBuffer;
use crate::callbacks::{MessageOutcome, SessionCallbacks, SessionStatus};
use crate::error::{Result, SyncError};
use crate::watermark::WatermarkStore;

/// Connection state of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none in progress.
    Disconnected,
    /// A connect attempt is waiting for its first signal.
    Connecting,
    /// The channel is live.
    Connected,
    /// The channel went down (connect failure or remote termination); the
    /// next cycle retries.
    Interrupted,
    /// The session was cancelled. Terminal.
    Cancelled,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Interrupted => "interrupted",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Outcome signal of one connect attempt, sent at most once.
type ConnectSignal = Arc<Mutex<Option<oneshot::Sender<std::result::Result<(), String>>>>>;

/// Owns the live subscription and the rules for routing its traffic.
pub(crate) struct SubscriptionManager {
    executor: Arc<dyn SubscriptionExecutor>,
    request: SubscriptionRequest,
    buffer: Arc<MessageBuffer>,
    watermark: Arc<WatermarkStore>,
    clock: Arc<dyn Clock>,
    hooks: Arc<SessionCallbacks>,
    state: Mutex<ConnectionState>,
    /// The live handle. Replaced only by a successful connect; the previous
    /// session is cancelled in the same swap.
    active: Mutex<Option<Box<dyn SubscriptionHandle>>>,
    /// Serializes connect attempts so only the first success performs the
    /// swap when attempts overlap.
    connect_gate: AsyncMutex<()>,
}

impl SubscriptionManager {
    pub(crate) fn new(
        executor: Arc<dyn SubscriptionExecutor>,
        request: SubscriptionRequest,
        buffer: Arc<MessageBuffer>,
        watermark: Arc<WatermarkStore>,
        clock: Arc<dyn Clock>,
        hooks: Arc<SessionCallbacks>,
    ) -> Self {
        Self {
            executor,
            request,
            buffer,
            watermark,
            clock,
            hooks,
            state: Mutex::new(ConnectionState::Disconnected),
            active: Mutex::new(None),
            connect_gate: AsyncMutex::new(()),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!(from = state.as_str(), to = next.as_str(), "subscription state changed");
            *state = next;
        }
    }

    /// Ensure the push channel is live, blocking the calling cycle until the
    /// first successful or failed connect signal.
    ///
    /// A failure is reported as an `interrupted` status, never as a fatal
    /// error; the caller aborts the rest of its cycle and the next cycle
    /// retries.
    pub(crate) async fn connect(self: Arc<Self>) -> Result<()> {
        if self.hooks.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let _gate = self.connect_gate.lock().await;
        if self.state() == ConnectionState::Connected {
            return Ok(());
        }
        self.set_state(ConnectionState::Connecting);

        let (sender, receiver) = oneshot::channel();
        let signal: ConnectSignal = Arc::new(Mutex::new(Some(sender)));

        let connect_signal = Arc::clone(&signal);
        let on_connect: ConnectCallback = Box::new(move || {
            if let Some(sender) = connect_signal.lock().take() {
                let _ = sender.send(Ok(()));
            }
        });

        let manager = Arc::clone(&self);
        let on_message: MessageCallback = Box::new(move |message: SubscriptionMessage| {
            // An error arriving before the first connect signal fails the
            // attempt instead of reaching the consumer.
            if let Some(error) = &message.error {
                if let Some(sender) = signal.lock().take() {
                    let _ = sender.send(Err(error.to_string()));
                    return;
                }
            }
            manager.route(message);
        });

        let handle = match self
            .executor
            .subscribe(&self.request, on_connect, on_message)
            .await
        {
            Ok(handle) => handle,
            Err(error) => {
                warn!("subscription attempt failed to dispatch: {error}");
                self.report_interrupted(error.to_string());
                return Err(SyncError::SubscriptionConnect(error.to_string()));
            }
        };

        match receiver.await {
            Ok(Ok(())) => {
                // First successful connect wins: swap the live handle and
                // cancel whatever it replaced.
                let previous = self.active.lock().replace(handle);
                if let Some(old) = previous {
                    old.cancel();
                }
                self.set_state(ConnectionState::Connected);
                self.hooks
                    .emit_event(CoreEvent::Subscription(SubscriptionEvent::Connected));
                info!("subscription connected");
                Ok(())
            }
            Ok(Err(reason)) => {
                handle.cancel();
                self.report_interrupted(reason.clone());
                Err(SyncError::SubscriptionConnect(reason))
            }
            Err(_) => {
                // The executor dropped both callbacks without ever signalling.
                handle.cancel();
                let reason = "connection closed before the first connect signal".to_string();
                self.report_interrupted(reason.clone());
                Err(SyncError::SubscriptionConnect(reason))
            }
        }
    }

    fn report_interrupted(&self, reason: String) {
        self.set_state(ConnectionState::Interrupted);
        self.hooks.status(SessionStatus::Interrupted);
        self.hooks
            .emit_event(CoreEvent::Subscription(SubscriptionEvent::Interrupted {
                reason,
            }));
    }

    /// Route one incoming message: buffer it while a cycle is in flight,
    /// deliver it immediately otherwise.
    fn route(&self, message: SubscriptionMessage) {
        if self.hooks.is_cancelled() {
            return;
        }

        // Remote termination is recoverable by design: status only, no error
        // through the message callback, reconnection on the next cycle.
        if let Some(error) = &message.error {
            if error.is_remote_terminated() {
                warn!("subscription terminated by remote: {error}");
                if let Some(handle) = self.active.lock().take() {
                    handle.cancel();
                }
                self.report_interrupted(error.to_string());
                return;
            }
        }

        let arrived_at = self.clock.now();
        if self.buffer.append(message.clone(), arrived_at) {
            debug!("buffered subscription message during active cycle");
            return;
        }

        self.deliver(message, arrived_at);
    }

    /// Deliver a message to the consumer, advancing the watermark when it
    /// applies cleanly. Returns whether the apply succeeded.
    pub(crate) fn deliver(&self, message: SubscriptionMessage, arrived_at: DateTime<Utc>) -> bool {
        match message.error {
            Some(error) => {
                self.hooks.message(MessageOutcome {
                    payload: None,
                    transaction: None,
                    error: Some(error),
                });
                false
            }
            None => {
                self.watermark.record_sync_event(arrived_at);
                self.hooks.message(MessageOutcome {
                    payload: message.payload,
                    transaction: message.transaction,
                    error: None,
                });
                true
            }
        }
    }

    /// Tear down the live subscription. Terminal.
    pub(crate) fn cancel(&self) {
        self.set_state(ConnectionState::Cancelled);
        if let Some(handle) = self.active.lock().take() {
            handle.cancel();
        }
    }
}

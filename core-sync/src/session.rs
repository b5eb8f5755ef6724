//! # Delta Sync Session
//!
//! Public facade over the sync engine. A session is constructed from an
//! immutable configuration, up to three operations (snapshot query, delta
//! query, subscription) with their result callbacks, and the platform
//! collaborators it borrows for the duration of its calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{DeltaSyncSession, SyncConfiguration, SyncOperations, SyncPlatform};
//! use std::sync::Arc;
//!
//! # async fn example(platform: SyncPlatform, operations: SyncOperations) {
//! let session = DeltaSyncSession::start(
//!     SyncConfiguration::new(60),
//!     operations,
//!     platform,
//!     Arc::new(|status| println!("sync status: {status}")),
//! )
//! .await
//! .expect("invalid session configuration");
//!
//! // ... later
//! session.cancel();
//! # }
//! ```

use std::sync::Arc;

use bridge_traits::lifecycle::LifecycleObserver;
use bridge_traits::metadata::SyncMetadataStore;
use bridge_traits::network::NetworkMonitor;
use bridge_traits::query::{QueryExecutor, QueryRequest};
use bridge_traits::subscription::{SubscriptionExecutor, SubscriptionRequest};
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::buffer::MessageBuffer;
use crate::callbacks::{
    DeltaCallback, MessageResultCallback, SessionCallbacks, SnapshotCallback, StatusCallback,
};
use crate::config::SyncConfiguration;
use crate::error::Result;
use crate::identity::OperationIdentity;
use crate::orchestrator::{CycleTrigger, SessionState, SyncOrchestrator};
use crate::scheduler::PollScheduler;
use crate::subscription::SubscriptionManager;
use crate::watermark::{SyncWatermark, WatermarkStore};

/// Capacity of the serialized cycle-trigger queue. Triggers beyond a full
/// queue are coalesced: a pending trigger already guarantees a cycle.
const TRIGGER_QUEUE_CAPACITY: usize = 8;

/// Snapshot operation: a query plus the callback receiving its results.
pub struct SnapshotOperation {
    pub query: QueryRequest,
    pub on_result: SnapshotCallback,
}

/// Delta operation: a query plus the callback receiving its results.
pub struct DeltaOperation {
    pub query: QueryRequest,
    pub on_result: DeltaCallback,
}

/// Subscription operation: a request plus the callback receiving messages.
pub struct SubscriptionOperation {
    pub request: SubscriptionRequest,
    pub on_message: MessageResultCallback,
}

/// The up-to-three operations a session synchronizes.
#[derive(Default)]
pub struct SyncOperations {
    pub snapshot: Option<SnapshotOperation>,
    pub delta: Option<DeltaOperation>,
    pub subscription: Option<SubscriptionOperation>,
}

impl SyncOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, query: QueryRequest, on_result: SnapshotCallback) -> Self {
        self.snapshot = Some(SnapshotOperation { query, on_result });
        self
    }

    pub fn with_delta(mut self, query: QueryRequest, on_result: DeltaCallback) -> Self {
        self.delta = Some(DeltaOperation { query, on_result });
        self
    }

    pub fn with_subscription(
        mut self,
        request: SubscriptionRequest,
        on_message: MessageResultCallback,
    ) -> Self {
        self.subscription = Some(SubscriptionOperation {
            request,
            on_message,
        });
        self
    }
}

/// Host collaborators a session operates against.
///
/// The session holds these only to issue calls; it never assumes any of them
/// outlives it, and it deregisters from the observers on cancellation.
pub struct SyncPlatform {
    pub query_executor: Arc<dyn QueryExecutor>,
    pub subscription_executor: Arc<dyn SubscriptionExecutor>,
    pub metadata_store: Arc<dyn SyncMetadataStore>,
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    pub clock: Arc<dyn Clock>,
    pub event_bus: EventBus,
}

impl SyncPlatform {
    pub fn new(
        query_executor: Arc<dyn QueryExecutor>,
        subscription_executor: Arc<dyn SubscriptionExecutor>,
        metadata_store: Arc<dyn SyncMetadataStore>,
    ) -> Self {
        Self {
            query_executor,
            subscription_executor,
            metadata_store,
            network_monitor: None,
            lifecycle_observer: None,
            clock: Arc::new(SystemClock),
            event_bus: EventBus::default(),
        }
    }

    pub fn with_network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    pub fn with_lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }
}

/// A running delta-synchronization session.
///
/// Dropping the session cancels it, so teardown happens on every exit path
/// of the owning scope, not just on explicit `cancel()`.
pub struct DeltaSyncSession {
    identity: OperationIdentity,
    hooks: Arc<SessionCallbacks>,
    orchestrator: Arc<SyncOrchestrator>,
    subscription: Option<Arc<SubscriptionManager>>,
    scheduler: Arc<PollScheduler>,
    watermark: Arc<WatermarkStore>,
    event_bus: EventBus,
    shutdown: CancellationToken,
}

impl DeltaSyncSession {
    /// Validate the configuration, load persisted watermarks, connect the
    /// trigger sources, and enqueue the first cycle.
    pub async fn start(
        config: SyncConfiguration,
        operations: SyncOperations,
        platform: SyncPlatform,
        on_status: StatusCallback,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let identity = OperationIdentity::compute(
            operations.snapshot.as_ref().map(|op| &op.query),
            operations.delta.as_ref().map(|op| &op.query),
            operations.subscription.as_ref().map(|op| &op.request),
        );
        info!(%identity, poll_interval_secs = config.poll_interval_secs, "starting delta sync session");

        let watermark =
            WatermarkStore::load(identity.clone(), Arc::clone(&platform.metadata_store)).await;
        let buffer = Arc::new(MessageBuffer::new());
        let scheduler = Arc::new(PollScheduler::new());

        let hooks = Arc::new(SessionCallbacks::new(
            on_status,
            operations.snapshot.as_ref().map(|op| Arc::clone(&op.on_result)),
            operations.delta.as_ref().map(|op| Arc::clone(&op.on_result)),
            operations
                .subscription
                .as_ref()
                .map(|op| Arc::clone(&op.on_message)),
            platform.event_bus.clone(),
        ));

        let subscription = operations.subscription.as_ref().map(|op| {
            Arc::new(SubscriptionManager::new(
                Arc::clone(&platform.subscription_executor),
                op.request.clone(),
                Arc::clone(&buffer),
                Arc::clone(&watermark),
                Arc::clone(&platform.clock),
                Arc::clone(&hooks),
            ))
        });

        let (trigger_tx, mut trigger_rx) = mpsc::channel(TRIGGER_QUEUE_CAPACITY);

        let orchestrator = Arc::new(SyncOrchestrator::new(
            config,
            Arc::clone(&platform.query_executor),
            operations.snapshot.map(|op| op.query),
            operations.delta.map(|op| op.query),
            subscription.clone(),
            Arc::clone(&buffer),
            Arc::clone(&watermark),
            Arc::clone(&scheduler),
            Arc::clone(&platform.clock),
            Arc::clone(&hooks),
            trigger_tx.clone(),
        ));

        let shutdown = CancellationToken::new();

        // Single worker drains the trigger queue: at most one cycle in
        // flight, later triggers wait behind it.
        let worker = Arc::clone(&orchestrator);
        let worker_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = worker_shutdown.cancelled() => break,
                    trigger = trigger_rx.recv() => match trigger {
                        Some(trigger) => worker.run_cycle(trigger).await,
                        None => break,
                    },
                }
            }
        });

        if let Some(observer) = &platform.lifecycle_observer {
            spawn_lifecycle_watcher(
                Arc::clone(observer),
                trigger_tx.clone(),
                shutdown.clone(),
            )
            .await?;
        }
        if let Some(monitor) = &platform.network_monitor {
            spawn_network_watcher(Arc::clone(monitor), trigger_tx.clone(), shutdown.clone())
                .await?;
        }

        let _ = trigger_tx.try_send(CycleTrigger::Initial);

        Ok(Arc::new(Self {
            identity,
            hooks,
            orchestrator,
            subscription,
            scheduler,
            watermark,
            event_bus: platform.event_bus,
            shutdown,
        }))
    }

    /// Stable per-session identifier for diagnostics and metadata
    /// correlation.
    pub fn identity(&self) -> &OperationIdentity {
        &self.identity
    }

    /// Current in-memory watermark values.
    pub fn watermark(&self) -> SyncWatermark {
        self.watermark.snapshot()
    }

    /// Current session lifecycle state.
    pub fn state(&self) -> SessionState {
        self.orchestrator.state()
    }

    /// Cancel the session: emit a single `cancelled` status and release the
    /// timer, the subscription, and the trigger watchers.
    ///
    /// Idempotent; repeated calls and calls during teardown are no-ops.
    /// Results of operations already in flight are discarded silently.
    pub fn cancel(&self) {
        if !self.hooks.mark_cancelled() {
            return;
        }
        info!(identity = %self.identity, "cancelling delta sync session");

        self.shutdown.cancel();
        self.scheduler.cancel();
        if let Some(manager) = &self.subscription {
            manager.cancel();
        }
        self.orchestrator.set_cancelled();
        let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Cancelled));
    }
}

impl Drop for DeltaSyncSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Enqueue a cycle whenever the app returns to the foreground.
async fn spawn_lifecycle_watcher(
    observer: Arc<dyn LifecycleObserver>,
    trigger_tx: mpsc::Sender<CycleTrigger>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut stream = observer.subscribe_changes().await?;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                state = stream.next() => match state {
                    Some(state) if state.is_foreground() => {
                        debug!("app foregrounded, enqueueing sync cycle");
                        let _ = trigger_tx.try_send(CycleTrigger::Foreground);
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }
    });
    Ok(())
}

/// Enqueue a cycle on every transition into an available network.
async fn spawn_network_watcher(
    monitor: Arc<dyn NetworkMonitor>,
    trigger_tx: mpsc::Sender<CycleTrigger>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut stream = monitor.subscribe_changes().await?;
    let mut was_available = monitor.is_connected().await;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                status = stream.next() => match status {
                    Some(status) => {
                        let available = status.is_available();
                        if available && !was_available {
                            debug!("network restored, enqueueing sync cycle");
                            let _ = trigger_tx.try_send(CycleTrigger::NetworkRestored);
                        }
                        was_available = available;
                    }
                    None => break,
                },
            }
        }
    });
    Ok(())
}

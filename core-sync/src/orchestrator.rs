//! The sync cycle state machine.
//!
//! One cycle: ensure the subscription is live, run the snapshot or delta
//! fetch as appropriate, then re-arm the poll timer and replay buffered
//! subscription traffic. Cycles are serialized on a single-worker trigger
//! queue, so at most one runs at a time per session; timer fires, foreground
//! transitions, and network restoration simply enqueue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bridge_traits::query::{CachePolicy, QueryExecutor, QueryRequest};
use bridge_traits::time::Clock;
use core_runtime::events::{CoreEvent, SyncEvent};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

use crate::buffer::MessageBuffer;
use crate::callbacks::{DeltaOutcome, SessionCallbacks, SessionStatus, SnapshotOutcome};
use crate::config::SyncConfiguration;
use crate::error::{Result, SyncError};
use crate::scheduler::PollScheduler;
use crate::subscription::SubscriptionManager;
use crate::watermark::WatermarkStore;

/// Variable name carrying the delta baseline to the remote source.
pub const DELTA_SINCE_VARIABLE: &str = "lastSync";

/// What enqueued a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleTrigger {
    Initial,
    Timer,
    Foreground,
    NetworkRestored,
}

impl CycleTrigger {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Timer => "timer",
            Self::Foreground => "foreground",
            Self::NetworkRestored => "network",
        }
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Between cycles, ready for the next trigger.
    Idle,
    /// A cycle is executing.
    Running,
    /// An unrecoverable non-terminal-channel condition stopped the session.
    Failed,
    /// A fatal condition stopped the session; no further cycles run.
    Terminated,
    /// The session was cancelled by the user. Terminal.
    Cancelled,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Terminated => "terminated",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Terminated | Self::Cancelled)
    }
}

/// What one cycle actually did, for events and the delta/snapshot gate.
#[derive(Debug, Clone, Copy, Default)]
struct CycleStats {
    snapshot_fetched: bool,
    delta_fetched: bool,
}

/// Drives one sync cycle at a time for a session.
pub(crate) struct SyncOrchestrator {
    config: SyncConfiguration,
    query_executor: Arc<dyn QueryExecutor>,
    snapshot_query: Option<QueryRequest>,
    delta_query: Option<QueryRequest>,
    subscription: Option<Arc<SubscriptionManager>>,
    buffer: Arc<MessageBuffer>,
    watermark: Arc<WatermarkStore>,
    scheduler: Arc<PollScheduler>,
    clock: Arc<dyn Clock>,
    hooks: Arc<SessionCallbacks>,
    /// Feeds the timer back into the serialized trigger queue.
    trigger_tx: mpsc::Sender<CycleTrigger>,
    state: Mutex<SessionState>,
    first_cycle_done: AtomicBool,
    initial_override_used: AtomicBool,
}

impl SyncOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: SyncConfiguration,
        query_executor: Arc<dyn QueryExecutor>,
        snapshot_query: Option<QueryRequest>,
        delta_query: Option<QueryRequest>,
        subscription: Option<Arc<SubscriptionManager>>,
        buffer: Arc<MessageBuffer>,
        watermark: Arc<WatermarkStore>,
        scheduler: Arc<PollScheduler>,
        clock: Arc<dyn Clock>,
        hooks: Arc<SessionCallbacks>,
        trigger_tx: mpsc::Sender<CycleTrigger>,
    ) -> Self {
        Self {
            config,
            query_executor,
            snapshot_query,
            delta_query,
            subscription,
            buffer,
            watermark,
            scheduler,
            clock,
            hooks,
            trigger_tx,
            state: Mutex::new(SessionState::Idle),
            first_cycle_done: AtomicBool::new(false),
            initial_override_used: AtomicBool::new(false),
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.lock()
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!(from = state.as_str(), to = next.as_str(), "session state changed");
            *state = next;
        }
    }

    pub(crate) fn set_cancelled(&self) {
        self.set_state(SessionState::Cancelled);
    }

    /// Execute one full sync cycle.
    #[instrument(skip(self), fields(trigger = trigger.as_str()))]
    pub(crate) async fn run_cycle(&self, trigger: CycleTrigger) {
        if self.hooks.is_cancelled() || self.state().is_terminal() {
            return;
        }
        self.set_state(SessionState::Running);
        self.hooks.emit_event(CoreEvent::Sync(SyncEvent::CycleStarted {
            trigger: trigger.as_str().to_string(),
        }));
        debug!("sync cycle started");

        // Step 1: queue any subscription traffic for ordered replay so it
        // cannot interleave with this cycle's snapshot/delta application.
        self.buffer.start_buffering();

        // Step 2: on the session's first cycle, give the consumer a fast
        // initial view straight from the cache before anything else.
        let first_cycle = !self.first_cycle_done.swap(true, Ordering::SeqCst);
        if first_cycle {
            self.deliver_cached_snapshot().await;
        }

        let outcome = self.run_gated_steps().await;

        // Step 6: cleanup runs on every exit path of steps 3-5.
        let (replayed, failed) = self.finish_cycle(&outcome);

        match outcome {
            Ok(stats) => {
                self.set_state(SessionState::Idle);
                self.hooks.status(SessionStatus::Active);
                self.hooks
                    .emit_event(CoreEvent::Sync(SyncEvent::CycleCompleted {
                        snapshot_fetched: stats.snapshot_fetched,
                        delta_fetched: stats.delta_fetched,
                        messages_replayed: replayed,
                        messages_failed: failed,
                    }));
                debug!(
                    snapshot = stats.snapshot_fetched,
                    delta = stats.delta_fetched,
                    replayed,
                    "sync cycle completed"
                );
            }
            Err(SyncError::Cancelled) => {
                // Late results of a cancelled session are discarded silently.
                self.set_state(SessionState::Cancelled);
            }
            Err(cycle_error) if cycle_error.is_recoverable() => {
                // Transient: back to idle, retried by the next trigger.
                self.set_state(SessionState::Idle);
                self.hooks
                    .emit_event(CoreEvent::Sync(SyncEvent::CycleFailed {
                        message: cycle_error.to_string(),
                        recoverable: true,
                    }));
                warn!("sync cycle failed: {cycle_error}");
            }
            Err(cycle_error) => {
                let message = cycle_error.to_string();
                let status = match &cycle_error {
                    SyncError::RecordPublish(_) => {
                        self.set_state(SessionState::Terminated);
                        SessionStatus::Terminated {
                            message: message.clone(),
                        }
                    }
                    _ => {
                        self.set_state(SessionState::Failed);
                        SessionStatus::Failed {
                            message: message.clone(),
                        }
                    }
                };
                self.scheduler.cancel();
                self.hooks.status(status);
                self.hooks
                    .emit_event(CoreEvent::Sync(SyncEvent::CycleFailed {
                        message,
                        recoverable: false,
                    }));
                error!("sync session stopped: {cycle_error}");
            }
        }
    }

    /// Steps 3-5. Any error here still flows through `finish_cycle`.
    async fn run_gated_steps(&self) -> Result<CycleStats> {
        let mut stats = CycleStats::default();

        // Step 3: a cycle without a live push channel would race ahead of the
        // messages it must order against, so it goes no further.
        if let Some(manager) = &self.subscription {
            Arc::clone(manager).connect().await?;
        }
        if self.hooks.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        // Step 4: snapshot fetch when none is recorded or the last is stale.
        if let Some(query) = &self.snapshot_query {
            if self.snapshot_due() {
                self.fetch_snapshot(query).await?;
                stats.snapshot_fetched = true;
            }
        }
        if self.hooks.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        // Step 5: delta fetch only when the snapshot skipped the network; a
        // fresh snapshot already encodes every delta.
        if !stats.snapshot_fetched {
            if let Some(query) = &self.delta_query {
                self.fetch_delta(query).await?;
                stats.delta_fetched = true;
            }
        }

        Ok(stats)
    }

    /// Step 6: re-arm the poll timer, stop buffering, replay the buffer in
    /// arrival order. Runs regardless of how steps 3-5 ended; the timer is
    /// only withheld once the session can never run another cycle.
    fn finish_cycle(&self, outcome: &Result<CycleStats>) -> (u64, u64) {
        let rearm = match outcome {
            Ok(_) => true,
            Err(SyncError::Cancelled) => false,
            Err(cycle_error) => cycle_error.is_recoverable(),
        };
        if rearm && !self.hooks.is_cancelled() {
            let trigger_tx = self.trigger_tx.clone();
            self.scheduler.arm(self.config.poll_interval(), move || {
                // A full queue already guarantees a pending cycle.
                let _ = trigger_tx.try_send(CycleTrigger::Timer);
            });
        }

        self.buffer.stop_buffering();

        let mut replayed = 0u64;
        let mut failed = 0u64;
        let drained = self.buffer.drain();
        if let Some(manager) = &self.subscription {
            if !self.hooks.is_cancelled() {
                for entry in drained {
                    if manager.deliver(entry.message, entry.arrived_at) {
                        replayed += 1;
                    } else {
                        failed += 1;
                    }
                }
            }
        }
        if replayed + failed > 0 {
            debug!(replayed, failed, "replayed buffered subscription messages");
        }
        (replayed, failed)
    }

    /// First-cycle cache read: delivered immediately, even when empty.
    async fn deliver_cached_snapshot(&self) {
        let Some(query) = &self.snapshot_query else {
            return;
        };
        debug!("delivering cache-only snapshot");
        match self
            .query_executor
            .fetch_snapshot(query, CachePolicy::CacheOnly)
            .await
        {
            Ok(response) => self.hooks.snapshot(SnapshotOutcome::success(response)),
            Err(cache_error) => self.hooks.snapshot(SnapshotOutcome::failure(
                SyncError::SnapshotFetch(cache_error.to_string()),
            )),
        }
    }

    /// Whether the network snapshot fetch is due this cycle.
    fn snapshot_due(&self) -> bool {
        match self.watermark.snapshot().last_snapshot_fetch_time {
            None => true,
            Some(last) => {
                let elapsed = self.clock.now().signed_duration_since(last);
                elapsed.num_seconds() > self.config.poll_interval_secs as i64
            }
        }
    }

    async fn fetch_snapshot(&self, query: &QueryRequest) -> Result<()> {
        debug!("running network snapshot fetch");
        match self
            .query_executor
            .fetch_snapshot(query, CachePolicy::NetworkOnly)
            .await
        {
            Ok(response) => {
                // Data alongside application errors still counts: the data is
                // in the store, so the watermark must cover it. Only a fetch
                // with neither data nor success aborts the cycle.
                if response.has_data() || response.is_success() {
                    let recorded = self.watermark.record_snapshot_fetch(self.clock.now());
                    self.hooks
                        .emit_event(CoreEvent::Sync(SyncEvent::WatermarkAdvanced {
                            last_sync_time: recorded.timestamp(),
                        }));
                    self.hooks.snapshot(SnapshotOutcome::success(response));
                    Ok(())
                } else {
                    let message = response.error_summary();
                    self.hooks.snapshot(SnapshotOutcome {
                        response: Some(response),
                        error: Some(SyncError::SnapshotFetch(message.clone())),
                    });
                    Err(SyncError::SnapshotFetch(message))
                }
            }
            Err(fetch_error) => {
                let message = fetch_error.to_string();
                self.hooks
                    .snapshot(SnapshotOutcome::failure(SyncError::SnapshotFetch(
                        message.clone(),
                    )));
                Err(SyncError::SnapshotFetch(message))
            }
        }
    }

    async fn fetch_delta(&self, query: &QueryRequest) -> Result<()> {
        let (since, used_override) = self.delta_baseline();
        let mut overrides: HashMap<String, Value> = HashMap::new();
        if let Some(baseline) = since {
            overrides.insert(
                DELTA_SINCE_VARIABLE.to_string(),
                Value::from(baseline.timestamp()),
            );
        }
        debug!(since = ?since, "running delta fetch");

        match self.query_executor.fetch_delta(query, overrides).await {
            Ok(delta) => {
                if used_override {
                    self.initial_override_used.store(true, Ordering::SeqCst);
                }
                let recorded = self.watermark.record_sync_event(self.clock.now());
                self.hooks
                    .emit_event(CoreEvent::Sync(SyncEvent::WatermarkAdvanced {
                        last_sync_time: recorded.timestamp(),
                    }));
                self.hooks
                    .delta(DeltaOutcome::success(delta.response, delta.transaction));
                Ok(())
            }
            Err(bridge_traits::BridgeError::StorePublish(message)) => {
                // Parsed records could not be applied to the store. Fatal for
                // the session, not for the process.
                self.hooks
                    .delta(DeltaOutcome::failure(SyncError::RecordPublish(
                        message.clone(),
                    )));
                Err(SyncError::RecordPublish(message))
            }
            Err(fetch_error) => {
                let message = fetch_error.to_string();
                self.hooks
                    .delta(DeltaOutcome::failure(SyncError::DeltaFetch(
                        message.clone(),
                    )));
                Err(SyncError::DeltaFetch(message))
            }
        }
    }

    /// Baseline for the next delta fetch: the configured override until the
    /// first successful delta fetch, the stored watermark afterwards.
    fn delta_baseline(&self) -> (Option<chrono::DateTime<chrono::Utc>>, bool) {
        if let Some(initial) = self.config.initial_sync_time {
            if !self.initial_override_used.load(Ordering::SeqCst) {
                return (Some(initial), true);
            }
        }
        (self.watermark.snapshot().last_sync_time, false)
    }
}

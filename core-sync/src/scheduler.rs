//! Poll scheduling.
//!
//! One re-armable one-shot timer bounds staleness: even with a quiet push
//! channel, a fresh cycle runs after the configured interval. The fire
//! callback must only enqueue a cycle on the orchestrator's trigger queue;
//! running a cycle inline on the timer task would overlap with an in-progress
//! cycle.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct ArmedTimer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// A single re-armable one-shot timer.
#[derive(Default)]
pub struct PollScheduler {
    slot: Mutex<Option<ArmedTimer>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer to invoke `on_fire` after `after`.
    ///
    /// Any pending timer is cancelled first, so at most one timer is pending
    /// at a time.
    pub fn arm<F>(&self, after: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let timer_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = timer_token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    debug!("poll timer fired");
                    on_fire();
                }
            }
        });

        let previous = self.slot.lock().replace(ArmedTimer { token, handle });
        if let Some(timer) = previous {
            timer.token.cancel();
        }
    }

    /// Cancel any pending timer. Idempotent; safe after the timer has fired.
    pub fn cancel(&self) {
        if let Some(timer) = self.slot.lock().take() {
            timer.token.cancel();
        }
    }

    /// Whether a timer is pending (armed and not yet fired or cancelled).
    pub fn is_armed(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_fire_invokes_callback() {
        let scheduler = PollScheduler::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        scheduler.arm(Duration::from_millis(10), move || {
            let _ = tx.send(());
        });

        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timer did not fire")
            .expect("channel closed");
    }

    #[tokio::test]
    async fn test_rearm_cancels_previous_timer() {
        let scheduler = PollScheduler::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first = tx.clone();
        scheduler.arm(Duration::from_millis(30), move || {
            let _ = first.send("first");
        });
        scheduler.arm(Duration::from_millis(30), move || {
            let _ = tx.send("second");
        });

        let fired = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timer did not fire")
            .expect("channel closed");
        assert_eq!(fired, "second");

        // The replaced timer must never fire.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let scheduler = PollScheduler::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        scheduler.arm(Duration::from_millis(20), move || {
            let _ = tx.send(());
        });
        scheduler.cancel();
        scheduler.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        assert!(!scheduler.is_armed());

        // Cancelling after a fire is also fine.
        scheduler.arm(Duration::from_millis(1), || {});
        tokio::time::sleep(Duration::from_millis(20)).await;
        scheduler.cancel();
    }
}

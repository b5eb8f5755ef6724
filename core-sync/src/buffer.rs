//! Message buffering for in-flight cycles.
//!
//! While a sync cycle runs, subscription traffic must not be applied inline:
//! a live message could land between the snapshot/delta fetch and its
//! delivery, breaking ordering relative to the baseline the cycle produces.
//! The buffering flag is the sole coordination between the delivery path and
//! the cycle. While it is set, delivery only appends here, and the cycle
//! replays the queue in arrival order once its fetch work is done.

use std::collections::VecDeque;

use bridge_traits::subscription::SubscriptionMessage;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// A subscription message held for ordered replay, with its arrival time.
#[derive(Debug, Clone)]
pub struct BufferedMessage {
    pub message: SubscriptionMessage,
    pub arrived_at: DateTime<Utc>,
}

#[derive(Default)]
struct BufferState {
    buffering: bool,
    queue: VecDeque<BufferedMessage>,
}

/// Holds subscription messages that arrive while a sync cycle is in flight.
#[derive(Default)]
pub struct MessageBuffer {
    state: Mutex<BufferState>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_buffering(&self) {
        self.state.lock().buffering = true;
    }

    pub fn stop_buffering(&self) {
        self.state.lock().buffering = false;
    }

    pub fn is_buffering(&self) -> bool {
        self.state.lock().buffering
    }

    /// Append a message while buffering is active.
    ///
    /// Returns `false` without taking the message when buffering is off; the
    /// caller then delivers it immediately instead.
    pub fn append(&self, message: SubscriptionMessage, arrived_at: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        if !state.buffering {
            return false;
        }
        state.queue.push_back(BufferedMessage {
            message,
            arrived_at,
        });
        true
    }

    /// Remove and return every buffered message in arrival order.
    ///
    /// The buffer is empty afterwards regardless of what the caller does with
    /// the messages; a failed apply never re-enters the queue.
    pub fn drain(&self) -> Vec<BufferedMessage> {
        self.state.lock().queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(id: u64) -> SubscriptionMessage {
        SubscriptionMessage::data(json!({ "id": id }))
    }

    #[test]
    fn test_append_requires_active_buffering() {
        let buffer = MessageBuffer::new();

        assert!(!buffer.append(message(1), Utc::now()));
        assert!(buffer.is_empty());

        buffer.start_buffering();
        assert!(buffer.append(message(1), Utc::now()));
        assert_eq!(buffer.len(), 1);

        buffer.stop_buffering();
        assert!(!buffer.append(message(2), Utc::now()));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_drain_preserves_arrival_order() {
        let buffer = MessageBuffer::new();
        buffer.start_buffering();

        for id in 0..5 {
            buffer.append(message(id), Utc::now());
        }

        let drained = buffer.drain();
        let ids: Vec<u64> = drained
            .iter()
            .map(|entry| entry.message.payload.as_ref().unwrap()["id"].as_u64().unwrap())
            .collect();

        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_empties_buffer_even_when_messages_remain_unapplied() {
        let buffer = MessageBuffer::new();
        buffer.start_buffering();
        buffer.append(message(1), Utc::now());

        // The caller drops the drained messages entirely; the buffer must not
        // hold on to them.
        let _ = buffer.drain();
        assert!(buffer.is_empty());
        assert_eq!(buffer.drain().len(), 0);
    }
}

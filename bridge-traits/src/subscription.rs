//! Subscription Transport Abstraction
//!
//! Defines the contract with the layer that maintains the live push channel.
//! The implementation owns the wire protocol; the sync engine only sees
//! connect signals and parsed messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::Result;
use crate::query::CacheTransactionId;

/// A canonical subscription request: text plus variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub text: String,
    pub variables: Map<String, Value>,
}

impl SubscriptionRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            variables: Map::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }
}

/// Error delivered through the push channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The remote side forcibly terminated the channel. Recoverable: the
    /// engine reports an interrupted status and reconnects on its next cycle.
    #[error("Subscription terminated by the remote side: {0}")]
    RemoteTerminated(String),

    /// A message could not be decoded or violated the channel protocol.
    #[error("Subscription protocol error: {0}")]
    Protocol(String),
}

impl SubscriptionError {
    pub fn is_remote_terminated(&self) -> bool {
        matches!(self, Self::RemoteTerminated(_))
    }
}

/// One message delivered over the push channel.
///
/// Payload and error are mutually exclusive in practice, but both fields
/// exist so transports can attach a transaction to either.
#[derive(Debug, Clone)]
pub struct SubscriptionMessage {
    pub payload: Option<Value>,
    pub transaction: Option<CacheTransactionId>,
    pub error: Option<SubscriptionError>,
}

impl SubscriptionMessage {
    pub fn data(payload: Value) -> Self {
        Self {
            payload: Some(payload),
            transaction: None,
            error: None,
        }
    }

    pub fn failure(error: SubscriptionError) -> Self {
        Self {
            payload: None,
            transaction: None,
            error: Some(error),
        }
    }

    pub fn with_transaction(mut self, transaction: CacheTransactionId) -> Self {
        self.transaction = Some(transaction);
        self
    }
}

/// Handle to an established subscription. Cancelling is synchronous and
/// idempotent; after cancel, no further callbacks fire for this handle.
pub trait SubscriptionHandle: Send + Sync {
    fn cancel(&self);
}

/// Invoked once the channel reports a successful connect.
pub type ConnectCallback = Box<dyn Fn() + Send + Sync>;

/// Invoked for every message (or channel error) on the live connection.
pub type MessageCallback = Box<dyn Fn(SubscriptionMessage) + Send + Sync>;

/// Subscription executor trait
///
/// `subscribe` establishes the channel asynchronously: it returns a handle as
/// soon as the attempt is dispatched, and signals the outcome through the
/// callbacks: `on_connect` on success, or `on_message` with an error when
/// the attempt fails before connecting.
#[async_trait]
pub trait SubscriptionExecutor: Send + Sync {
    async fn subscribe(
        &self,
        request: &SubscriptionRequest,
        on_connect: ConnectCallback,
        on_message: MessageCallback,
    ) -> Result<Box<dyn SubscriptionHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_terminated_classification() {
        let terminated = SubscriptionError::RemoteTerminated("server shutdown".into());
        let protocol = SubscriptionError::Protocol("bad frame".into());

        assert!(terminated.is_remote_terminated());
        assert!(!protocol.is_remote_terminated());
    }

    #[test]
    fn test_message_constructors() {
        let message = SubscriptionMessage::data(json!({"id": 1})).with_transaction(
            CacheTransactionId(7),
        );
        assert!(message.payload.is_some());
        assert!(message.error.is_none());
        assert_eq!(message.transaction, Some(CacheTransactionId(7)));

        let failure =
            SubscriptionMessage::failure(SubscriptionError::Protocol("bad frame".into()));
        assert!(failure.payload.is_none());
        assert!(failure.error.is_some());
    }
}

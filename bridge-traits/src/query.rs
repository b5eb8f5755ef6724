//! Query Execution Abstraction
//!
//! Defines the contract with the layer that serializes, transports, and
//! parses snapshot and delta queries. The executor owns response parsing and
//! record publication to the local store; the sync engine only sees the
//! parsed outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::Result;

/// Where a snapshot fetch is allowed to read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve from the local cache only; never touch the network.
    CacheOnly,
    /// Bypass the cache and fetch from the remote source.
    NetworkOnly,
}

/// A canonical request: query text plus its variables.
///
/// The text and variables together determine the operation identity used to
/// key persisted sync metadata, so both must be stable for a given
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Canonical query text.
    pub text: String,
    /// Query variables, keyed by name.
    pub variables: Map<String, Value>,
}

impl QueryRequest {
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

/// An application-level error carried inside a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryError {
    pub message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A parsed query response.
///
/// Data and errors are not mutually exclusive: a response can carry partial
/// data alongside application errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub data: Option<Value>,
    pub errors: Vec<QueryError>,
}

impl QueryResponse {
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Joined error messages, for logging and error propagation.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Identifier of the store transaction under which a fetch published its
/// records. Opaque to the sync engine; forwarded to the consumer so it can
/// correlate its own writes with the publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheTransactionId(pub u64);

/// Outcome of a delta fetch: the parsed response plus the store transaction
/// the executor published the records under.
#[derive(Debug, Clone)]
pub struct DeltaResponse {
    pub response: QueryResponse,
    pub transaction: Option<CacheTransactionId>,
}

/// Query executor trait
///
/// Implementations own serialization, transport, timeouts/retries, response
/// parsing, and record publication. The sync engine imposes no timeout of its
/// own on these calls.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::query::{CachePolicy, QueryExecutor, QueryRequest};
///
/// async fn warm_start(executor: &dyn QueryExecutor, query: &QueryRequest) {
///     // Serve whatever the cache already has, without touching the network.
///     let cached = executor.fetch_snapshot(query, CachePolicy::CacheOnly).await;
/// }
/// ```
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Fetch a full-state snapshot under the given cache policy.
    async fn fetch_snapshot(
        &self,
        query: &QueryRequest,
        policy: CachePolicy,
    ) -> Result<QueryResponse>;

    /// Fetch changes since the watermark carried in `override_variables`
    /// (merged over the request's own variables by the implementor).
    ///
    /// A record-publish invariant violation while applying the parsed
    /// response surfaces as [`BridgeError::StorePublish`](crate::error::BridgeError).
    async fn fetch_delta(
        &self,
        query: &QueryRequest,
        override_variables: HashMap<String, Value>,
    ) -> Result<DeltaResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_variables() {
        let request = QueryRequest::new("query Items { items { id } }")
            .with_variable("limit", json!(50))
            .with_variable("cursor", json!(null));

        assert_eq!(request.variables.len(), 2);
        assert_eq!(request.variables["limit"], json!(50));
    }

    #[test]
    fn test_response_with_partial_data_is_not_success() {
        let response = QueryResponse {
            data: Some(json!({"items": []})),
            errors: vec![QueryError::new("field resolution failed")],
        };

        assert!(response.has_data());
        assert!(!response.is_success());
        assert_eq!(response.error_summary(), "field resolution failed");
    }
}

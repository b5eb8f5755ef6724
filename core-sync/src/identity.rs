//! Operation identity derivation.
//!
//! Sync metadata is keyed by a stable identifier computed from the configured
//! operations. Identical configuration (same request texts, same variables)
//! must always resolve to the same key, across processes and restarts, so the
//! identity is a SHA-256 digest over a canonical encoding of whichever of the
//! snapshot query, delta query, and subscription are present.

use std::collections::BTreeMap;
use std::fmt;

use bridge_traits::query::QueryRequest;
use bridge_traits::subscription::SubscriptionRequest;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Stable identifier for a (snapshot, delta, subscription) operation triple.
///
/// Computed once per session and immutable for its lifetime. Recomputation is
/// cheap relative to any network operation, so callers may derive it on
/// demand rather than caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationIdentity(String);

impl OperationIdentity {
    pub fn compute(
        snapshot: Option<&QueryRequest>,
        delta: Option<&QueryRequest>,
        subscription: Option<&SubscriptionRequest>,
    ) -> Self {
        let mut hasher = Sha256::new();
        if let Some(query) = snapshot {
            hash_operation(&mut hasher, "snapshot", &query.text, &query.variables);
        }
        if let Some(query) = delta {
            hash_operation(&mut hasher, "delta", &query.text, &query.variables);
        }
        if let Some(request) = subscription {
            hash_operation(&mut hasher, "subscription", &request.text, &request.variables);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hash_operation(hasher: &mut Sha256, tag: &str, text: &str, variables: &Map<String, Value>) {
    hasher.update(tag.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hasher.update([0u8]);

    // Sorted keys keep the encoding canonical regardless of insertion order.
    let canonical: BTreeMap<&String, &Value> = variables.iter().collect();
    for (name, value) in canonical {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.to_string().as_bytes());
        hasher.update([0u8]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot_query() -> QueryRequest {
        QueryRequest::new("query Items { items { id updatedAt } }")
            .with_variable("limit", json!(100))
    }

    #[test]
    fn test_identical_configuration_yields_identical_identity() {
        let delta = QueryRequest::new("query Delta($lastSync: Int) { delta(lastSync: $lastSync) }");

        let first = OperationIdentity::compute(Some(&snapshot_query()), Some(&delta), None);
        let second = OperationIdentity::compute(Some(&snapshot_query()), Some(&delta), None);

        assert_eq!(first, second);
    }

    #[test]
    fn test_variable_insertion_order_does_not_matter() {
        let a = QueryRequest::new("query Items { items }")
            .with_variable("a", json!(1))
            .with_variable("b", json!(2));
        let b = QueryRequest::new("query Items { items }")
            .with_variable("b", json!(2))
            .with_variable("a", json!(1));

        assert_eq!(
            OperationIdentity::compute(Some(&a), None, None),
            OperationIdentity::compute(Some(&b), None, None)
        );
    }

    #[test]
    fn test_different_variables_change_identity() {
        let a = snapshot_query();
        let b = snapshot_query().with_variable("limit", json!(200));

        assert_ne!(
            OperationIdentity::compute(Some(&a), None, None),
            OperationIdentity::compute(Some(&b), None, None)
        );
    }

    #[test]
    fn test_operation_slot_matters() {
        let query = snapshot_query();

        // The same request configured as snapshot vs delta must not collide.
        assert_ne!(
            OperationIdentity::compute(Some(&query), None, None),
            OperationIdentity::compute(None, Some(&query), None)
        );
    }
}

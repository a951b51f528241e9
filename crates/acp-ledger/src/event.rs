// event.rs — Ledger event data model and hash computation.
//
// The hash of an event covers its timestamp, type, payload, and the
// previous event's hash. The preimage is built from the typed fields with
// a fixed layout, so verification does not depend on JSON field order:
// the payload is serialized through serde_json::Value, whose maps are
// key-sorted, making the serialization canonical.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::hasher;

/// `prev_hash` sentinel for the first event in a stream.
pub const GENESIS_HASH: &str = "GENESIS";

/// One event in the hash chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEvent {
    /// When the event was appended (UTC).
    pub ts: DateTime<Utc>,

    /// Event type tag (e.g., "decision_created").
    #[serde(rename = "type")]
    pub event_type: String,

    /// The event body, already redacted.
    pub payload: serde_json::Value,

    /// Hash of the previous event, or [`GENESIS_HASH`] for the first one.
    pub prev_hash: String,

    /// SHA-256 over (ts, type, payload, prev_hash).
    pub hash: String,
}

impl LedgerEvent {
    /// Build a new event, computing its hash from the given predecessor.
    pub fn chained(
        event_type: &str,
        payload: serde_json::Value,
        prev_hash: &str,
    ) -> Result<Self, LedgerError> {
        let ts = Utc::now();
        let hash = compute_hash(&ts, event_type, &payload, prev_hash)?;
        Ok(Self {
            ts,
            event_type: event_type.to_string(),
            payload,
            prev_hash: prev_hash.to_string(),
            hash,
        })
    }

    /// Recompute this event's hash from its stored fields.
    ///
    /// Equal to `self.hash` unless the event was altered after appending.
    pub fn recompute_hash(&self) -> Result<String, LedgerError> {
        compute_hash(&self.ts, &self.event_type, &self.payload, &self.prev_hash)
    }
}

/// The canonical hash preimage: timestamp, type, payload JSON, and the
/// previous hash, newline-separated.
fn compute_hash(
    ts: &DateTime<Utc>,
    event_type: &str,
    payload: &serde_json::Value,
    prev_hash: &str,
) -> Result<String, LedgerError> {
    let payload_json = serde_json::to_string(payload)?;
    let preimage = format!(
        "{}\n{}\n{}\n{}",
        ts.to_rfc3339_opts(SecondsFormat::Micros, true),
        event_type,
        payload_json,
        prev_hash
    );
    Ok(hasher::hash_str(&preimage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_event_chains_from_genesis() {
        let event = LedgerEvent::chained("test", json!({"k": "v"}), GENESIS_HASH).unwrap();
        assert_eq!(event.prev_hash, GENESIS_HASH);
        assert_eq!(event.hash.len(), 64);
    }

    #[test]
    fn recompute_matches_stored_hash() {
        let event = LedgerEvent::chained("test", json!({"k": "v"}), GENESIS_HASH).unwrap();
        assert_eq!(event.recompute_hash().unwrap(), event.hash);
    }

    #[test]
    fn payload_mutation_changes_the_hash() {
        let mut event = LedgerEvent::chained("test", json!({"k": "v"}), GENESIS_HASH).unwrap();
        event.payload = json!({"k": "tampered"});
        assert_ne!(event.recompute_hash().unwrap(), event.hash);
    }

    #[test]
    fn hash_is_field_order_independent() {
        // The same logical payload arriving with different key order must
        // hash identically — Value maps are key-sorted.
        let a: serde_json::Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn event_serialization_round_trip() {
        let event = LedgerEvent::chained("decision_created", json!({"id": 7}), "abc").unwrap();
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"decision_created\""));
        let restored: LedgerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, event);
        assert_eq!(restored.recompute_hash().unwrap(), event.hash);
    }
}

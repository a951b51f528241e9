// adapter.rs — Execution adapters: where approved actions actually go.
//
// The decision machine's correctness does not depend on what the adapter
// does; it only records the outcome. The bundled adapter is simulated —
// it echoes the request and performs no real side effect.

use serde_json::{json, Value};
use thiserror::Error;

/// An adapter execution failure. Recorded in the audit trail; does not
/// prevent the decision from being marked executed.
#[derive(Debug, Error)]
#[error("adapter error: {0}")]
pub struct AdapterError(pub String);

/// Carries out the side effect of an approved decision against a target
/// system.
pub trait ExecutionAdapter: Send + Sync {
    fn execute(&self, system: &str, action: &str, payload: &Value)
        -> Result<Value, AdapterError>;
}

/// A no-side-effect adapter that simulates every target system.
#[derive(Default)]
pub struct SimulatedAdapter;

impl SimulatedAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionAdapter for SimulatedAdapter {
    fn execute(
        &self,
        system: &str,
        action: &str,
        _payload: &Value,
    ) -> Result<Value, AdapterError> {
        tracing::debug!("SimulatedAdapter: {} on {} (no-op)", action, system);
        Ok(json!({
            "system": system,
            "action": action,
            "simulated": true,
            "result": "ok",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_adapter_echoes_the_request() {
        let adapter = SimulatedAdapter::new();
        let out = adapter
            .execute("salesforce", "update_record", &json!({"field": "x"}))
            .unwrap();
        assert_eq!(out["system"], "salesforce");
        assert_eq!(out["action"], "update_record");
        assert_eq!(out["simulated"], true);
    }
}

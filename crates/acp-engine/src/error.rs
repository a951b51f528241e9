// error.rs — Error taxonomy for the decision engine.
//
// Validation, NotFound, and StateConflict are expected, caller-recoverable
// outcomes; they are returned as typed results and the rejection is still
// audited. Policy errors indicate misconfiguration and should fail the
// engine's startup health check rather than be caught per request. Storage
// and ledger errors on reads that determine authoritative state abort the
// operation — proceeding on missing state risks bypassing a kill or pause.

use thiserror::Error;

/// Errors surfaced by governance operations.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// Malformed input — rejected before any state change.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown agent, decision, or override id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The policy pack is internally inconsistent (operator-facing).
    #[error("policy error: {0}")]
    Policy(#[from] acp_policy::PolicyError),

    /// An operation was attempted against a record in the wrong state.
    #[error("state conflict on {kind} {id}: {detail}")]
    StateConflict {
        kind: &'static str,
        id: String,
        detail: String,
    },

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(#[from] acp_store::StorageError),

    /// The ledger failed (I/O, corruption, or integrity violation).
    #[error("ledger error: {0}")]
    Ledger(#[from] acp_ledger::LedgerError),

    /// An engine configuration document failed to parse.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A stored record failed to decode (projection corruption).
    #[error("corrupt {kind} record: {detail}")]
    Corrupt { kind: &'static str, detail: String },
}

// error.rs — Error types for the ledger subsystem.

use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The underlying storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(#[from] acp_store::StorageError),

    /// An event could not be serialized or a stored event is not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A redaction pattern failed to compile.
    #[error("invalid redaction pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A stored entry could not be decoded as a ledger event.
    #[error("corrupt ledger entry at id {id}: {detail}")]
    Corrupt { id: u64, detail: String },

    /// The chain does not validate — some past event was altered.
    #[error("integrity violation at event {index}: expected {expected}, got {actual}")]
    IntegrityViolation {
        index: u64,
        expected: String,
        actual: String,
    },
}

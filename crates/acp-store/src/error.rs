// error.rs — Error types for the storage subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A log entry contained an embedded newline and cannot be appended.
    #[error("log entry for stream '{stream}' contains an embedded newline")]
    InvalidEntry { stream: String },
}

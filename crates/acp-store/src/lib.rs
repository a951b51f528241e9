//! # acp-store
//!
//! Pluggable storage for the Agent Control Plane.
//!
//! Every stateful component in ACP (the ledger, the agent/decision/override
//! projections) talks to storage through the [`Storage`] trait rather than a
//! global in-process map. Two backends ship with the crate:
//!
//! - [`MemoryStorage`] — in-memory, used in tests and demos
//! - [`FileStorage`] — JSON files for keys, JSONL files for log streams
//!
//! ## Quick Example
//!
//! ```rust
//! use acp_store::{MemoryStorage, Storage};
//!
//! let store = MemoryStorage::new();
//! store.set("agent:1", b"{\"name\":\"demo\"}").unwrap();
//! let id = store.append_to_log("ledger", b"{\"type\":\"event\"}").unwrap();
//! assert_eq!(id, 0);
//! ```

pub mod error;
pub mod file;
pub mod memory;

pub use error::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;

/// The storage collaborator every ACP component depends on.
///
/// Implementations must be safe to share across worker threads. Log streams
/// are append-only: `append_to_log` assigns the next sequential id within
/// the stream, and entries are never rewritten in place.
///
/// Log entries must be single-line payloads (no embedded newlines) — callers
/// append one serialized JSON object per entry.
pub trait Storage: Send + Sync {
    /// Fetch the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, overwriting any existing value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Return the values of every key starting with `prefix`.
    fn list(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StorageError>;

    /// Append one entry to the named log stream, returning its sequential id.
    fn append_to_log(&self, stream: &str, entry: &[u8]) -> Result<u64, StorageError>;

    /// Read up to `count` entries from the stream starting at `from_id`.
    fn range_log(&self, stream: &str, from_id: u64, count: usize)
        -> Result<Vec<(u64, Vec<u8>)>, StorageError>;
}

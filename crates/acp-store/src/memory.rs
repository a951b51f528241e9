// memory.rs — In-memory storage backend.
//
// Backs every key and log stream with plain maps behind mutexes. This is
// the default backend for tests and short-lived demos; nothing survives
// process exit.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::StorageError;
use crate::Storage;

/// In-memory [`Storage`] implementation.
///
/// Also serves as the test double for components that take an injected
/// storage dependency.
#[derive(Default)]
pub struct MemoryStorage {
    kv: Mutex<HashMap<String, Vec<u8>>>,
    logs: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl MemoryStorage {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let kv = self.kv.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(kv.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut kv = self.kv.lock().unwrap_or_else(PoisonError::into_inner);
        kv.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        let kv = self.kv.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<&String> = kv.keys().filter(|k| k.starts_with(prefix)).collect();
        // Deterministic order regardless of hash-map iteration order.
        keys.sort();
        Ok(keys.into_iter().map(|k| kv[k].clone()).collect())
    }

    fn append_to_log(&self, stream: &str, entry: &[u8]) -> Result<u64, StorageError> {
        if entry.contains(&b'\n') {
            return Err(StorageError::InvalidEntry {
                stream: stream.to_string(),
            });
        }
        let mut logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        let log = logs.entry(stream.to_string()).or_default();
        log.push(entry.to_vec());
        Ok((log.len() - 1) as u64)
    }

    fn range_log(
        &self,
        stream: &str,
        from_id: u64,
        count: usize,
    ) -> Result<Vec<(u64, Vec<u8>)>, StorageError> {
        let logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(log) = logs.get(stream) else {
            return Ok(Vec::new());
        };
        Ok(log
            .iter()
            .enumerate()
            .skip(from_id as usize)
            .take(count)
            .map(|(i, e)| (i as u64, e.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_none_for_missing_key() {
        let store = MemoryStorage::new();
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn set_then_get_round_trip() {
        let store = MemoryStorage::new();
        store.set("agent:1", b"value").unwrap();
        assert_eq!(store.get("agent:1").unwrap().unwrap(), b"value");
    }

    #[test]
    fn set_overwrites_existing_value() {
        let store = MemoryStorage::new();
        store.set("k", b"old").unwrap();
        store.set("k", b"new").unwrap();
        assert_eq!(store.get("k").unwrap().unwrap(), b"new");
    }

    #[test]
    fn list_filters_by_prefix() {
        let store = MemoryStorage::new();
        store.set("agent:1", b"a").unwrap();
        store.set("agent:2", b"b").unwrap();
        store.set("decision:1", b"c").unwrap();

        let agents = store.list("agent:").unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(store.list("decision:").unwrap().len(), 1);
        assert!(store.list("override:").unwrap().is_empty());
    }

    #[test]
    fn log_ids_are_sequential() {
        let store = MemoryStorage::new();
        assert_eq!(store.append_to_log("ledger", b"one").unwrap(), 0);
        assert_eq!(store.append_to_log("ledger", b"two").unwrap(), 1);
        assert_eq!(store.append_to_log("other", b"three").unwrap(), 0);
    }

    #[test]
    fn range_log_respects_from_and_count() {
        let store = MemoryStorage::new();
        for i in 0..5 {
            store
                .append_to_log("ledger", format!("entry-{i}").as_bytes())
                .unwrap();
        }

        let slice = store.range_log("ledger", 1, 2).unwrap();
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0], (1, b"entry-1".to_vec()));
        assert_eq!(slice[1], (2, b"entry-2".to_vec()));
    }

    #[test]
    fn range_log_on_missing_stream_is_empty() {
        let store = MemoryStorage::new();
        assert!(store.range_log("nothing", 0, 10).unwrap().is_empty());
    }

    #[test]
    fn newline_in_entry_is_rejected() {
        let store = MemoryStorage::new();
        let result = store.append_to_log("ledger", b"bad\nentry");
        assert!(matches!(result, Err(StorageError::InvalidEntry { .. })));
    }
}

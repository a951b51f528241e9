// file.rs — File-backed storage backend.
//
// Keys are stored as one file per key under `<root>/kv/`, log streams as
// JSONL files under `<root>/logs/`: one entry per line, entry id = line
// number. The layout is easy to inspect manually with cat/jq.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::StorageError;
use crate::Storage;

/// File-backed [`Storage`] implementation.
///
/// Log appends are serialized through an internal mutex so two concurrent
/// writers cannot interleave partial lines; the mutex also guards the
/// per-stream next-id counters.
pub struct FileStorage {
    root: PathBuf,
    /// stream name → next entry id, lazily recovered from the file on first use.
    next_ids: Mutex<HashMap<String, u64>>,
}

impl FileStorage {
    /// Create a store rooted at the given directory, creating it if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        for sub in ["kv", "logs"] {
            let dir = root.join(sub);
            fs::create_dir_all(&dir).map_err(|source| StorageError::Io { path: dir, source })?;
        }
        Ok(Self {
            root,
            next_ids: Mutex::new(HashMap::new()),
        })
    }

    fn kv_path(&self, key: &str) -> PathBuf {
        self.root.join("kv").join(sanitize(key))
    }

    fn log_path(&self, stream: &str) -> PathBuf {
        self.root.join("logs").join(format!("{}.jsonl", sanitize(stream)))
    }

    /// Count the lines already present in a stream file.
    fn recover_next_id(&self, stream: &str) -> Result<u64, StorageError> {
        let path = self.log_path(stream);
        if !path.exists() {
            return Ok(0);
        }
        let file = File::open(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        let mut count = 0u64;
        for line in BufReader::new(file).lines() {
            line.map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            count += 1;
        }
        Ok(count)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.kv_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .map_err(|source| StorageError::Io { path, source })
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.kv_path(key);
        fs::write(&path, value).map_err(|source| StorageError::Io { path, source })
    }

    fn list(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        let dir = self.root.join("kv");
        let sanitized = sanitize(prefix);
        let entries = fs::read_dir(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::Io {
                path: dir.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&sanitized) {
                paths.push(entry.path());
            }
        }
        // Directory iteration order is platform-dependent; sort for determinism.
        paths.sort();

        let mut values = Vec::new();
        for path in paths {
            let bytes = fs::read(&path).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            values.push(bytes);
        }
        Ok(values)
    }

    fn append_to_log(&self, stream: &str, entry: &[u8]) -> Result<u64, StorageError> {
        if entry.contains(&b'\n') {
            return Err(StorageError::InvalidEntry {
                stream: stream.to_string(),
            });
        }

        let mut next_ids = self.next_ids.lock().unwrap_or_else(PoisonError::into_inner);
        let next = match next_ids.get(stream) {
            Some(n) => *n,
            None => self.recover_next_id(stream)?,
        };

        let path = self.log_path(stream);
        // Append mode — existing entries are never overwritten.
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
        file.write_all(entry)
            .and_then(|_| file.write_all(b"\n"))
            .and_then(|_| file.flush())
            .map_err(|source| StorageError::Io { path, source })?;

        next_ids.insert(stream.to_string(), next + 1);
        Ok(next)
    }

    fn range_log(
        &self,
        stream: &str,
        from_id: u64,
        count: usize,
    ) -> Result<Vec<(u64, Vec<u8>)>, StorageError> {
        let path = self.log_path(stream);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        let mut out = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            let id = i as u64;
            if id < from_id {
                continue;
            }
            if out.len() >= count {
                break;
            }
            out.push((id, line.into_bytes()));
        }
        Ok(out)
    }
}

/// Map a key to a filesystem-safe file name.
///
/// Keys in ACP look like `agent:<uuid>`; anything outside `[A-Za-z0-9._-]`
/// becomes `_`. The mapping keeps prefix filtering intact for those keys.
fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

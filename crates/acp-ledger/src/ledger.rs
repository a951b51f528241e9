// ledger.rs — The hash-chained ledger over a storage stream.
//
// Appends are serialized: the tail mutex is held across read-tail +
// append, so two concurrent appends can never observe the same prev_hash
// and both succeed. That is the invariant that keeps the chain fork-free.
//
// Reads used for state reconstruction must propagate errors — treating an
// unreadable ledger as "no prior state" would let a killed agent reappear
// as active.

use std::sync::{Arc, Mutex, PoisonError};

use acp_store::Storage;
use serde_json::Value;

use crate::error::LedgerError;
use crate::event::{LedgerEvent, GENESIS_HASH};
use crate::redact::Redact;

/// How many entries each chunked read pulls from storage.
const READ_CHUNK: usize = 512;

/// Append-only, tamper-evident event log.
pub struct Ledger {
    storage: Arc<dyn Storage>,
    stream: String,
    redactor: Arc<dyn Redact>,
    /// Hash of the most recent event, or [`GENESIS_HASH`] when empty.
    tail: Mutex<String>,
}

impl Ledger {
    /// Open a ledger on the given stream, recovering the chain tail from
    /// any events already stored there.
    pub fn open(
        storage: Arc<dyn Storage>,
        stream: impl Into<String>,
        redactor: Arc<dyn Redact>,
    ) -> Result<Self, LedgerError> {
        let stream = stream.into();
        let ledger = Self {
            storage,
            stream,
            redactor,
            tail: Mutex::new(GENESIS_HASH.to_string()),
        };
        let recovered = match ledger.read_all()?.last() {
            Some(event) => event.hash.clone(),
            None => GENESIS_HASH.to_string(),
        };
        *ledger.tail.lock().unwrap_or_else(PoisonError::into_inner) = recovered;
        Ok(ledger)
    }

    /// Redact, chain, and append one event. Returns the stored event.
    ///
    /// Callers decide whether a failure here is hard (state-bearing
    /// events) or soft (pure telemetry); see the engine's audit policy.
    pub fn append(&self, event_type: &str, payload: Value) -> Result<LedgerEvent, LedgerError> {
        let safe = self.redactor.redact(payload);

        // Hold the tail lock across read + append: serialized append
        // ordering per stream.
        let mut tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner);
        let event = LedgerEvent::chained(event_type, safe, &tail)?;
        let line = serde_json::to_string(&event)?;
        self.storage.append_to_log(&self.stream, line.as_bytes())?;
        *tail = event.hash.clone();

        tracing::debug!("ledger append: {} ({})", event_type, event.hash);
        Ok(event)
    }

    /// Scan from most recent to oldest and return the payload of the first
    /// event whose type matches and whose payload satisfies `predicate`.
    pub fn latest_matching(
        &self,
        event_type: &str,
        predicate: impl Fn(&Value) -> bool,
    ) -> Result<Option<Value>, LedgerError> {
        let events = self.read_all()?;
        for event in events.into_iter().rev() {
            if event.event_type == event_type && predicate(&event.payload) {
                return Ok(Some(event.payload));
            }
        }
        Ok(None)
    }

    /// All events, oldest first.
    pub fn events(&self) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.read_all()
    }

    /// Walk the chain from genesis and verify every link and hash.
    ///
    /// Returns the number of verified events, or the first violation.
    pub fn verify(&self) -> Result<usize, LedgerError> {
        let events = self.read_all()?;
        let mut prev = GENESIS_HASH.to_string();

        for (index, event) in events.iter().enumerate() {
            if event.prev_hash != prev {
                return Err(LedgerError::IntegrityViolation {
                    index: index as u64,
                    expected: prev,
                    actual: event.prev_hash.clone(),
                });
            }
            let recomputed = event.recompute_hash()?;
            if recomputed != event.hash {
                return Err(LedgerError::IntegrityViolation {
                    index: index as u64,
                    expected: recomputed,
                    actual: event.hash.clone(),
                });
            }
            prev = event.hash.clone();
        }

        Ok(events.len())
    }

    fn read_all(&self) -> Result<Vec<LedgerEvent>, LedgerError> {
        let mut events = Vec::new();
        let mut from = 0u64;
        loop {
            let chunk = self.storage.range_log(&self.stream, from, READ_CHUNK)?;
            if chunk.is_empty() {
                break;
            }
            for (id, bytes) in &chunk {
                let event: LedgerEvent =
                    serde_json::from_slice(bytes).map_err(|e| LedgerError::Corrupt {
                        id: *id,
                        detail: e.to_string(),
                    })?;
                events.push(event);
            }
            from = chunk[chunk.len() - 1].0 + 1;
        }
        Ok(events)
    }
}

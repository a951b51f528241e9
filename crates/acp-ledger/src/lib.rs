//! # acp-ledger
//!
//! Append-only, hash-chained event ledger for the Agent Control Plane.
//!
//! Every governance event — agent registration, gate decision, status
//! change, override, execution — is appended as a [`LedgerEvent`] whose
//! hash covers the previous event's hash. Editing any past event
//! invalidates every hash after it, which is what makes the trail
//! tamper-evident.
//!
//! Payloads pass through an injected [`Redact`] implementation before they
//! are hashed or stored, so raw secrets and personal data never reach the
//! chain.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::sync::Arc;
//! use acp_ledger::{AuditRedactor, Ledger};
//! use acp_store::MemoryStorage;
//! use serde_json::json;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let redactor = Arc::new(AuditRedactor::new().unwrap());
//! let ledger = Ledger::open(storage, "ledger", redactor).unwrap();
//! let event = ledger.append("agent_registered", json!({"agent_id": "a-1"})).unwrap();
//! assert_eq!(event.prev_hash, acp_ledger::GENESIS_HASH);
//! ```

pub mod error;
pub mod event;
pub mod hasher;
pub mod ledger;
pub mod redact;

pub use error::LedgerError;
pub use event::{LedgerEvent, GENESIS_HASH};
pub use ledger::Ledger;
pub use redact::{hash_identity, AuditRedactor, Redact};

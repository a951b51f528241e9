//! # acp-engine
//!
//! The decision engine of the Agent Control Plane.
//!
//! Orchestrates tier resolution ([`acp_policy`]), control derivation, the
//! decision state machine, and the hash-chained ledger ([`acp_ledger`])
//! behind one write-authoritative component: [`DecisionEngine`].
//!
//! Agents register, get a frozen risk tier, and must clear design-time
//! approval before any action is gated. Each gated action becomes a
//! [`Decision`]: AUTO and HOTL decisions proceed immediately, HITL
//! decisions wait for a human with a single-use approval token. Tier
//! overrides are time-bounded and consulted at evaluation time.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use acp_engine::{AgentRegistration, DecisionEngine, EngineConfig, SimulatedAdapter};
//! use acp_ledger::AuditRedactor;
//! use acp_policy::{ConfigSource, FileConfigSource};
//! use acp_store::MemoryStorage;
//!
//! let pack = Arc::new(
//!     FileConfigSource::new("config/policy_pack.json")
//!         .load_policy_pack()
//!         .unwrap(),
//! );
//! let engine = DecisionEngine::new(
//!     pack,
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(AuditRedactor::new().unwrap()),
//!     Arc::new(SimulatedAdapter::new()),
//!     None,
//!     EngineConfig::default(),
//! )
//! .unwrap();
//! let agent = engine
//!     .register_agent(AgentRegistration {
//!         name: "Demo Agent".into(),
//!         owner: "alice@example.com".into(),
//!         ..Default::default()
//!     })
//!     .unwrap();
//! println!("registered at tier {}", agent.tier);
//! ```

pub mod adapter;
pub mod agent;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod event;
pub mod overrides;
pub mod projection;
pub mod signal;

pub use adapter::{AdapterError, ExecutionAdapter, SimulatedAdapter};
pub use agent::{Agent, AgentStatus};
pub use config::EngineConfig;
pub use decision::{ControlMode, Decision, DecisionStatus, ExecutionResult};
pub use engine::{
    ActionRequest, AgentRegistration, AuditFilter, DecisionEngine, DecisionSnapshot,
};
pub use error::GovernanceError;
pub use event::{EventKind, ReasonCode};
pub use overrides::{OverrideManager, OverrideRecord, OverrideStatus};
pub use projection::{Projections, RebuildCounts};
pub use signal::{KeywordExtractor, SignalError, SignalExtractor};

//! # acp-policy
//!
//! Policy pack loading, deterministic tier resolution, and control
//! derivation for the Agent Control Plane.
//!
//! A [`PolicyPack`] is an immutable, versioned configuration object: an
//! ordered tier list, an ordered rule list, and per-tier default controls.
//! [`resolve`] maps a normalized [`Intent`] to a risk tier using the
//! MAX_TIER merge strategy (the highest-ranked tier among all matching
//! rules wins), and [`controls_for`] looks up the [`ControlBundle`] a tier
//! carries.
//!
//! ## Key invariants
//!
//! - **Determinism**: `resolve` is a pure function of `(intent, pack)` —
//!   no clock, no randomness, no external state.
//! - **Never under-tier**: multiple matching rules merge by taking the
//!   highest-ranked tier, never the first match or an average.
//! - **Fail-fast loading**: a pack whose `tierOrder` is missing a
//!   referenced tier, or whose required fields are absent, is rejected at
//!   load time — never silently defaulted.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use acp_policy::{resolve, ConfigSource, FileConfigSource, Intent};
//!
//! let pack = FileConfigSource::new("config/policy_pack.json")
//!     .load_policy_pack()
//!     .unwrap();
//! let intent = Intent::conservative();
//! let resolution = resolve(&intent, &pack);
//! println!("tier {}", resolution.tier);
//! ```

pub mod controls;
pub mod error;
pub mod intent;
pub mod loader;
pub mod pack;
pub mod resolver;

pub use controls::controls_for;
pub use error::PolicyError;
pub use intent::{DataSensitivity, Intent, PartialIntent};
pub use loader::{ConfigSource, FileConfigSource};
pub use pack::{AuditLevel, ControlBundle, MergeStrategy, PolicyPack, Rule, RuleConditions, Tier};
pub use resolver::{resolve, TierResolution};

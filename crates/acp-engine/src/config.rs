// config.rs — Engine tunables.
//
// Loaded from engine.toml when present; every field has a safe default.
// The action sets drive control-mode derivation: restricted actions force
// HITL regardless of tier, write actions get HOTL review.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Actions that always require pre-execution human approval.
const DEFAULT_RESTRICTED: &[&str] = &[
    "approve",
    "transfer_funds",
    "terminate_access",
    "send_external_email",
    "delete",
];

/// Actions that proceed with post-hoc human-on-the-loop review.
const DEFAULT_WRITE: &[&str] = &[
    "update_record",
    "create_ticket",
    "send_message",
    "execute_workflow",
    "submit",
    "write",
];

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// The environment assumed for callers that do not declare one.
    pub environment: String,
    /// Actions forced to HITL regardless of tier controls.
    pub restricted_actions: BTreeSet<String>,
    /// Actions given HOTL review when tier controls allow.
    pub write_actions: BTreeSet<String>,
    /// How long a HITL approval token stays valid.
    pub approval_token_ttl_minutes: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: "sandbox".to_string(),
            restricted_actions: DEFAULT_RESTRICTED.iter().map(|s| s.to_string()).collect(),
            write_actions: DEFAULT_WRITE.iter().map(|s| s.to_string()).collect(),
            approval_token_ttl_minutes: 60,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(doc: &str) -> Result<Self, GovernanceError> {
        Ok(toml::from_str(doc)?)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GovernanceError> {
        let doc = fs::read_to_string(path.as_ref()).map_err(|source| {
            GovernanceError::Storage(acp_store::StorageError::Io {
                path: path.as_ref().to_path_buf(),
                source,
            })
        })?;
        Self::from_toml_str(&doc)
    }
}

// error.rs — Error types for the policy subsystem.
//
// PolicyError is operator-facing: every variant signals a misconfigured or
// internally inconsistent policy pack, not bad user input. Callers should
// fail startup health checks on these rather than catching them per request.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or consulting a policy pack.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A required field is absent from the pack document.
    #[error("policy missing: {field}")]
    MissingField { field: String },

    /// The pack document is not valid JSON for the expected schema.
    #[error("policy parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The pack file could not be read.
    #[error("failed to read policy pack at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// `tierOrder` lists the same tier twice.
    #[error("tierOrder contains duplicate tier '{tier}'")]
    DuplicateTier { tier: String },

    /// A tier is referenced by a rule or tier entry but missing from `tierOrder`.
    #[error("tier '{tier}' referenced by {referenced_by} is not in tierOrder")]
    UnorderedTier { tier: String, referenced_by: String },

    /// Two rules share the same id.
    #[error("duplicate rule id '{id}'")]
    DuplicateRuleId { id: String },

    /// A resolvable tier has no default-controls entry.
    #[error("tier '{tier}' has no defaultControls entry")]
    MissingTierDefaults { tier: String },

    /// Control lookup was asked for a tier the pack does not define.
    /// Unreachable for a validated pack; signals a load defect.
    #[error("unknown tier '{tier}'")]
    UnknownTier { tier: String },
}

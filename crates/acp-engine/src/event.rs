// event.rs — Ledger event kinds and stable reason codes.
//
// Event kinds partition the unified ledger stream by what happened; reason
// codes are the machine-parseable half of every gate outcome (the
// human-readable rationale travels next to them).

use serde::{Deserialize, Serialize};

/// The kinds of events the engine appends to the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An agent entered the registry (status `requested`).
    AgentRegistered,
    /// An agent moved between lifecycle states.
    AgentStatusChanged,
    /// A gated decision record was created.
    DecisionCreated,
    /// A decision moved between lifecycle states.
    DecisionStatusChanged,
    /// A tier override was requested.
    OverrideRequested,
    /// A tier override was approved with a TTL.
    OverrideApproved,
    /// A pending tier override was rejected.
    OverrideRejected,
    /// A tier override was revoked.
    OverrideRevoked,
    /// An ALLOW/DENY audit record for a gated operation.
    GateDecision,
    /// An approved decision was handed to the execution adapter.
    Execution,
}

impl EventKind {
    /// The snake_case tag used in the ledger stream.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AgentRegistered => "agent_registered",
            EventKind::AgentStatusChanged => "agent_status_changed",
            EventKind::DecisionCreated => "decision_created",
            EventKind::DecisionStatusChanged => "decision_status_changed",
            EventKind::OverrideRequested => "override_requested",
            EventKind::OverrideApproved => "override_approved",
            EventKind::OverrideRejected => "override_rejected",
            EventKind::OverrideRevoked => "override_revoked",
            EventKind::GateDecision => "gate_decision",
            EventKind::Execution => "execution",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent_registered" => Ok(EventKind::AgentRegistered),
            "agent_status_changed" => Ok(EventKind::AgentStatusChanged),
            "decision_created" => Ok(EventKind::DecisionCreated),
            "decision_status_changed" => Ok(EventKind::DecisionStatusChanged),
            "override_requested" => Ok(EventKind::OverrideRequested),
            "override_approved" => Ok(EventKind::OverrideApproved),
            "override_rejected" => Ok(EventKind::OverrideRejected),
            "override_revoked" => Ok(EventKind::OverrideRevoked),
            "gate_decision" => Ok(EventKind::GateDecision),
            "execution" => Ok(EventKind::Execution),
            other => Err(format!("unknown event type '{other}'")),
        }
    }
}

/// Stable, machine-parseable outcome codes.
///
/// Automated callers branch on these; the paired rationale string is for
/// human reviewers. Codes never change meaning across versions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// The request was malformed (missing action/target, unknown tier…).
    InvalidRequest,
    /// No agent with that id is registered.
    NotRegistered,
    /// The agent was killed — terminal.
    AgentKilled,
    /// The agent was terminated — terminal.
    AgentTerminated,
    /// The agent is paused.
    AgentPaused,
    /// The agent has not cleared design-time approval yet.
    ApprovalPending,
    /// Allowed automatically, no human involvement.
    AutoAllowed,
    /// Allowed with post-hoc human-on-the-loop review.
    HotlReview,
    /// Pre-execution human approval required.
    ApprovalRequired,
    /// Sandbox-only controls deny execution outside the sandbox.
    SandboxOnly,
    /// The policy pack could not answer (operator-facing defect).
    PolicyUnavailable,
    /// A human approved the decision.
    DecisionApproved,
    /// A human denied the decision.
    DecisionDenied,
    /// The decision was executed.
    Executed,
    /// A single-use approval token was missing, expired, or wrong.
    TokenInvalid,
    /// The operation hit a record in the wrong state.
    StateConflict,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::InvalidRequest => "invalid_request",
            ReasonCode::NotRegistered => "not_registered",
            ReasonCode::AgentKilled => "agent_killed",
            ReasonCode::AgentTerminated => "agent_terminated",
            ReasonCode::AgentPaused => "agent_paused",
            ReasonCode::ApprovalPending => "approval_pending",
            ReasonCode::AutoAllowed => "auto_allowed",
            ReasonCode::HotlReview => "hotl_review",
            ReasonCode::ApprovalRequired => "approval_required",
            ReasonCode::SandboxOnly => "sandbox_only",
            ReasonCode::PolicyUnavailable => "policy_unavailable",
            ReasonCode::DecisionApproved => "decision_approved",
            ReasonCode::DecisionDenied => "decision_denied",
            ReasonCode::Executed => "executed",
            ReasonCode::TokenInvalid => "token_invalid",
            ReasonCode::StateConflict => "state_conflict",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

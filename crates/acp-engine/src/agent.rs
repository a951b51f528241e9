// agent.rs — Agent registry records and lifecycle state machine.
//
// Agents enter the registry as `requested` with design-time approval not
// yet granted. Only explicit governance actions move them forward:
//
//   requested → approved → paused ⇄ approved
//   any non-terminal state → killed | terminated
//
// Killed and terminated are terminal — no transition leaves them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use acp_policy::{ControlBundle, Intent, Tier};

use crate::error::GovernanceError;

/// Lifecycle state of a registered agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Registered, awaiting design-time approval.
    Requested,
    /// Cleared to request gated actions.
    Approved,
    /// Temporarily suspended; evaluation is denied while paused.
    Paused,
    /// Emergency hard stop. Terminal.
    Killed,
    /// Decommissioned. Terminal.
    Terminated,
}

impl AgentStatus {
    /// Killed and terminated agents never come back.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Killed | AgentStatus::Terminated)
    }

    /// Check whether moving from this state to `next` is a legal
    /// governance action.
    pub fn can_transition_to(&self, next: &AgentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            AgentStatus::Killed | AgentStatus::Terminated => true,
            AgentStatus::Approved => {
                matches!(self, AgentStatus::Requested | AgentStatus::Paused)
            }
            AgentStatus::Paused => matches!(self, AgentStatus::Approved),
            AgentStatus::Requested => false,
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Requested => write!(f, "requested"),
            AgentStatus::Approved => write!(f, "approved"),
            AgentStatus::Paused => write!(f, "paused"),
            AgentStatus::Killed => write!(f, "killed"),
            AgentStatus::Terminated => write!(f, "terminated"),
        }
    }
}

/// A registered agent and everything frozen at registration time.
///
/// The tier is computed once here and stays stable until the agent is
/// explicitly re-registered; only an active override substitutes a
/// different tier at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    pub agent_id: Uuid,
    pub name: String,
    /// Pseudonymized owner identity (12-hex hash prefix).
    pub owner_hash: String,
    pub problem_statement: String,
    pub status: AgentStatus,
    /// Design-time approval flag; set when the agent first reaches
    /// `approved`.
    pub approved: bool,
    pub tier: Tier,
    pub controls: ControlBundle,
    pub allowed_tools: Vec<String>,
    pub intent: Intent,
    pub policy_version: String,
    pub matched_rule_ids: Vec<String>,
    /// `"<rule-id>: <rationale>"` lines explaining the tier assignment.
    pub tier_reasons: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Agent {
    /// Apply a governance transition, enforcing lifecycle legality.
    pub fn transition(&mut self, next: AgentStatus) -> Result<(), GovernanceError> {
        if !self.status.can_transition_to(&next) {
            return Err(GovernanceError::StateConflict {
                kind: "agent",
                id: self.agent_id.to_string(),
                detail: format!("cannot transition from {} to {}", self.status, next),
            });
        }
        if next == AgentStatus::Approved && !self.approved {
            self.approved = true;
            self.approved_at = Some(Utc::now());
        }
        self.status = next;
        Ok(())
    }
}

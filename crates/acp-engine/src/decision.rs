// decision.rs — Gated decision records and their state machine.
//
// A decision is the record of one gated action request. AUTO and HOTL
// decisions are born already approved and may proceed straight to
// execution; HITL decisions are born pending and need a human. Denied and
// executed are terminal:
//
//   PENDING → APPROVED | DENIED
//   APPROVED → EXECUTED

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use acp_policy::Tier;

use crate::error::GovernanceError;
use crate::event::ReasonCode;

/// How much human involvement gates the action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControlMode {
    /// No human involvement.
    Auto,
    /// Human-on-the-loop: proceeds now, reviewed after the fact.
    Hotl,
    /// Human-in-the-loop: pre-execution approval required.
    Hitl,
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlMode::Auto => write!(f, "AUTO"),
            ControlMode::Hotl => write!(f, "HOTL"),
            ControlMode::Hitl => write!(f, "HITL"),
        }
    }
}

/// Lifecycle state of a decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionStatus {
    Pending,
    Approved,
    Denied,
    Executed,
}

impl DecisionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DecisionStatus::Denied | DecisionStatus::Executed)
    }

    pub fn can_transition_to(&self, next: &DecisionStatus) -> bool {
        matches!(
            (self, next),
            (DecisionStatus::Pending, DecisionStatus::Approved)
                | (DecisionStatus::Pending, DecisionStatus::Denied)
                | (DecisionStatus::Approved, DecisionStatus::Executed)
        )
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionStatus::Pending => write!(f, "PENDING"),
            DecisionStatus::Approved => write!(f, "APPROVED"),
            DecisionStatus::Denied => write!(f, "DENIED"),
            DecisionStatus::Executed => write!(f, "EXECUTED"),
        }
    }
}

/// The record of one gated action request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub decision_id: Uuid,
    pub agent_id: Uuid,
    pub action: String,
    pub target: String,
    /// The tier in force when the decision was made (override-aware).
    pub tier: Tier,
    pub control_mode: ControlMode,
    /// Whether the action may proceed without further approval.
    pub allowed: bool,
    pub status: DecisionStatus,
    pub reason: ReasonCode,
    pub rationale: String,
    pub policy_version: String,
    pub matched_rule_ids: Vec<String>,
    /// SHA-256 of the single-use approval token (HITL only). The raw token
    /// is handed to the caller once and never persisted. Absent from
    /// ledger payloads — see [`Decision::ledger_payload`].
    #[serde(default)]
    pub approval_token_sha: Option<String>,
    #[serde(default)]
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Pseudonymized identity of whoever approved or denied.
    pub approver_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Decision {
    /// Apply a lifecycle transition, enforcing legality.
    ///
    /// A caller attempting to move a terminal decision gets a
    /// StateConflict, never a silent no-op — "already decided" must be
    /// distinguishable from "succeeded".
    pub fn transition(&mut self, next: DecisionStatus) -> Result<(), GovernanceError> {
        if !self.status.can_transition_to(&next) {
            return Err(GovernanceError::StateConflict {
                kind: "decision",
                id: self.decision_id.to_string(),
                detail: format!("cannot transition from {} to {}", self.status, next),
            });
        }
        self.status = next;
        Ok(())
    }

    /// The decision serialized for the ledger, with token material
    /// stripped. Tokens are ephemeral secrets; they live only in the
    /// projection and do not survive a replay.
    pub fn ledger_payload(&self) -> serde_json::Value {
        let mut value = serde_json::json!({ "decision": self });
        if let Some(decision) = value
            .get_mut("decision")
            .and_then(serde_json::Value::as_object_mut)
        {
            decision.remove("approval_token_sha");
            decision.remove("token_expires_at");
        }
        value
    }
}

/// What came back from handing an approved decision to the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub decision_id: Uuid,
    /// Always true with the bundled adapter — no real side effects.
    pub simulated: bool,
    pub adapter_ok: bool,
    pub output: serde_json::Value,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_decision(status: DecisionStatus) -> Decision {
        Decision {
            decision_id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            action: "update_record".to_string(),
            target: "salesforce".to_string(),
            tier: Tier::from("A5"),
            control_mode: ControlMode::Hitl,
            allowed: false,
            status,
            reason: ReasonCode::ApprovalRequired,
            rationale: "requires approval".to_string(),
            policy_version: "v2".to_string(),
            matched_rule_ids: vec!["pii".to_string()],
            approval_token_sha: Some("a".repeat(64)),
            token_expires_at: Some(Utc::now()),
            approver_hash: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pending_can_be_approved_or_denied() {
        let mut d = test_decision(DecisionStatus::Pending);
        d.transition(DecisionStatus::Approved).unwrap();

        let mut d = test_decision(DecisionStatus::Pending);
        d.transition(DecisionStatus::Denied).unwrap();
    }

    #[test]
    fn approved_can_only_execute() {
        let mut d = test_decision(DecisionStatus::Approved);
        assert!(matches!(
            d.clone().transition(DecisionStatus::Denied),
            Err(GovernanceError::StateConflict { .. })
        ));
        d.transition(DecisionStatus::Executed).unwrap();
    }

    #[test]
    fn denied_and_executed_are_terminal() {
        for terminal in [DecisionStatus::Denied, DecisionStatus::Executed] {
            assert!(terminal.is_terminal());
            for next in [
                DecisionStatus::Pending,
                DecisionStatus::Approved,
                DecisionStatus::Denied,
                DecisionStatus::Executed,
            ] {
                let mut d = test_decision(terminal);
                assert!(matches!(
                    d.transition(next),
                    Err(GovernanceError::StateConflict { .. })
                ));
            }
        }
    }

    #[test]
    fn pending_cannot_jump_to_executed() {
        let mut d = test_decision(DecisionStatus::Pending);
        assert!(matches!(
            d.transition(DecisionStatus::Executed),
            Err(GovernanceError::StateConflict { .. })
        ));
    }

    #[test]
    fn ledger_payload_strips_token_material() {
        let d = test_decision(DecisionStatus::Pending);
        let payload = d.ledger_payload();
        assert!(payload["decision"].get("approval_token_sha").is_none());
        assert!(payload["decision"].get("token_expires_at").is_none());
        assert_eq!(payload["decision"]["action"], "update_record");
    }

    #[test]
    fn statuses_serialize_uppercase() {
        assert_eq!(
            serde_json::to_string(&DecisionStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&ControlMode::Hitl).unwrap(),
            "\"HITL\""
        );
    }
}

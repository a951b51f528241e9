// projection.rs — Materialized views over the ledger.
//
// The ledger is the source of truth; these keyed records are the
// read-optimized projection next to it. Every engine write updates both.
// `rebuild` replays the ledger oldest→newest and reconstructs the same
// projection deterministically, which is also how a lost or corrupted
// projection is recovered.

use std::sync::Arc;

use acp_ledger::Ledger;
use acp_store::Storage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::agent::{Agent, AgentStatus};
use crate::decision::{Decision, DecisionStatus};
use crate::error::GovernanceError;
use crate::overrides::OverrideRecord;

const AGENT_PREFIX: &str = "agent:";
const DECISION_PREFIX: &str = "decision:";
const OVERRIDE_PREFIX: &str = "override:";

/// Typed access to the per-entity current-state records.
#[derive(Clone)]
pub struct Projections {
    storage: Arc<dyn Storage>,
}

/// What a [`Projections::rebuild`] pass reconstructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildCounts {
    pub agents: usize,
    pub decisions: usize,
    pub overrides: usize,
}

impl Projections {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn put_agent(&self, agent: &Agent) -> Result<(), GovernanceError> {
        self.put(AGENT_PREFIX, agent.agent_id, agent, "agent")
    }

    pub fn get_agent(&self, agent_id: Uuid) -> Result<Option<Agent>, GovernanceError> {
        self.get(AGENT_PREFIX, agent_id, "agent")
    }

    /// All agents, newest first.
    pub fn list_agents(&self) -> Result<Vec<Agent>, GovernanceError> {
        let mut agents: Vec<Agent> = self.list(AGENT_PREFIX, "agent")?;
        agents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(agents)
    }

    pub fn put_decision(&self, decision: &Decision) -> Result<(), GovernanceError> {
        self.put(DECISION_PREFIX, decision.decision_id, decision, "decision")
    }

    pub fn get_decision(&self, decision_id: Uuid) -> Result<Option<Decision>, GovernanceError> {
        self.get(DECISION_PREFIX, decision_id, "decision")
    }

    /// All decisions, newest first.
    pub fn list_decisions(&self) -> Result<Vec<Decision>, GovernanceError> {
        let mut decisions: Vec<Decision> = self.list(DECISION_PREFIX, "decision")?;
        decisions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(decisions)
    }

    pub fn put_override(&self, record: &OverrideRecord) -> Result<(), GovernanceError> {
        self.put(OVERRIDE_PREFIX, record.override_id, record, "override")
    }

    pub fn get_override(
        &self,
        override_id: Uuid,
    ) -> Result<Option<OverrideRecord>, GovernanceError> {
        self.get(OVERRIDE_PREFIX, override_id, "override")
    }

    /// All overrides, newest request first.
    pub fn list_overrides(&self) -> Result<Vec<OverrideRecord>, GovernanceError> {
        let mut overrides: Vec<OverrideRecord> = self.list(OVERRIDE_PREFIX, "override")?;
        overrides.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(overrides)
    }

    /// Replay the ledger and reconstruct every projection record.
    ///
    /// The replay applies events oldest→newest, so the final state is the
    /// same no matter how the log was produced. Approval-token material is
    /// absent from ledger payloads and therefore does not survive a
    /// rebuild.
    pub fn rebuild(&self, ledger: &Ledger) -> Result<RebuildCounts, GovernanceError> {
        let mut counts = RebuildCounts::default();

        for event in ledger.events()? {
            match event.event_type.as_str() {
                "agent_registered" => {
                    let agent: Agent = decode(&event.payload["agent"], "agent")?;
                    self.put_agent(&agent)?;
                    counts.agents += 1;
                }
                "agent_status_changed" => {
                    let agent_id: Uuid = decode(&event.payload["agent_id"], "agent")?;
                    let status: AgentStatus = decode(&event.payload["to"], "agent")?;
                    if let Some(mut agent) = self.get_agent(agent_id)? {
                        if status == AgentStatus::Approved && !agent.approved {
                            agent.approved = true;
                            agent.approved_at = Some(event.ts);
                        }
                        agent.status = status;
                        self.put_agent(&agent)?;
                    }
                }
                "decision_created" => {
                    let decision: Decision = decode(&event.payload["decision"], "decision")?;
                    self.put_decision(&decision)?;
                    counts.decisions += 1;
                }
                "decision_status_changed" => {
                    let decision_id: Uuid = decode(&event.payload["decision_id"], "decision")?;
                    let status: DecisionStatus = decode(&event.payload["status"], "decision")?;
                    if let Some(mut decision) = self.get_decision(decision_id)? {
                        decision.status = status;
                        if let Some(by) = event.payload["by_hash"].as_str() {
                            decision.approver_hash = Some(by.to_string());
                        }
                        decision.approval_token_sha = None;
                        decision.token_expires_at = None;
                        self.put_decision(&decision)?;
                    }
                }
                "override_requested" | "override_approved" | "override_rejected"
                | "override_revoked" => {
                    let record: OverrideRecord = decode(&event.payload["override"], "override")?;
                    if event.event_type == "override_requested" {
                        counts.overrides += 1;
                    }
                    self.put_override(&record)?;
                }
                // gate_decision / execution are pure telemetry.
                _ => {}
            }
        }

        Ok(counts)
    }

    fn key(prefix: &str, id: Uuid) -> String {
        format!("{prefix}{id}")
    }

    fn put<T: Serialize>(
        &self,
        prefix: &str,
        id: Uuid,
        record: &T,
        kind: &'static str,
    ) -> Result<(), GovernanceError> {
        let bytes = serde_json::to_vec(record).map_err(|e| GovernanceError::Corrupt {
            kind,
            detail: e.to_string(),
        })?;
        self.storage.set(&Self::key(prefix, id), &bytes)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(
        &self,
        prefix: &str,
        id: Uuid,
        kind: &'static str,
    ) -> Result<Option<T>, GovernanceError> {
        match self.storage.get(&Self::key(prefix, id))? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes).map_err(|e| {
                    GovernanceError::Corrupt {
                        kind,
                        detail: e.to_string(),
                    }
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn list<T: DeserializeOwned>(
        &self,
        prefix: &str,
        kind: &'static str,
    ) -> Result<Vec<T>, GovernanceError> {
        let mut records = Vec::new();
        for bytes in self.storage.list(prefix)? {
            let record =
                serde_json::from_slice(&bytes).map_err(|e| GovernanceError::Corrupt {
                    kind,
                    detail: e.to_string(),
                })?;
            records.push(record);
        }
        Ok(records)
    }
}

fn decode<T: DeserializeOwned>(
    value: &serde_json::Value,
    kind: &'static str,
) -> Result<T, GovernanceError> {
    serde_json::from_value(value.clone()).map_err(|e| GovernanceError::Corrupt {
        kind,
        detail: e.to_string(),
    })
}

// engine.rs — The decision engine.
//
// The single component with write authority over agent and decision state.
// Every gated call runs the same chokepoint sequence:
//
// 1. Does the agent exist? → No → NotFound
// 2. Is the agent killed/terminated? → Yes → deny (terminal)
// 3. Is the agent paused? → Yes → deny
// 4. Has design-time approval been granted? → No → deny
// 5. Resolve the effective tier (active override beats the stored tier)
// 6. Derive the tier's control bundle
// 7. Derive the control mode (HITL / HOTL / AUTO)
// 8. sandbox-only controls deny any non-sandbox environment outright
// 9. Persist the decision and audit the outcome
//
// Every branch — including the early denials — emits exactly one
// gate_decision audit event with a stable reason code. State-bearing
// ledger appends are hard failures; the gate_decision telemetry append is
// soft: it is logged and the decision path completes.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use acp_ledger::{hash_identity, hasher, Ledger, LedgerEvent, Redact};
use acp_policy::{controls_for, resolve, DataSensitivity, Intent, PolicyPack, Tier};
use acp_store::Storage;

use crate::adapter::ExecutionAdapter;
use crate::agent::{Agent, AgentStatus};
use crate::config::EngineConfig;
use crate::decision::{ControlMode, Decision, DecisionStatus, ExecutionResult};
use crate::error::GovernanceError;
use crate::event::{EventKind, ReasonCode};
use crate::overrides::{OverrideManager, OverrideRecord};
use crate::projection::{Projections, RebuildCounts};
use crate::signal::SignalExtractor;

/// The single ledger stream every governance event lands in.
const LEDGER_STREAM: &str = "ledger";

/// Input to [`DecisionEngine::register_agent`].
#[derive(Debug, Clone, Default)]
pub struct AgentRegistration {
    pub name: String,
    pub owner: String,
    /// Free-text description, used for advisory signal extraction when no
    /// structured intent was supplied.
    pub problem_statement: String,
    pub actions: Vec<String>,
    pub systems: Vec<String>,
    pub data_sensitivity: Option<DataSensitivity>,
    pub cross_border: Option<bool>,
    /// Explicit tier, taking precedence over rule resolution.
    pub override_tier: Option<Tier>,
}

/// Input to [`DecisionEngine::evaluate`].
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub agent_id: Uuid,
    pub action: String,
    pub target: String,
    /// The caller's declared environment; defaults to the engine's
    /// configured environment when absent.
    pub environment: Option<String>,
    /// Optional per-call intent, recorded in the audit trail. Does not
    /// re-tier the agent — tier is frozen at registration.
    pub intent: Option<Intent>,
}

impl ActionRequest {
    pub fn new(agent_id: Uuid, action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            agent_id,
            action: action.into(),
            target: target.into(),
            environment: None,
            intent: None,
        }
    }
}

/// What a caller gets back from [`DecisionEngine::evaluate`].
///
/// Early agent-state denials carry no decision record — only the reason
/// code and rationale (the audit entry is the record). Gate outcomes that
/// reach step 9 embed the persisted decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionSnapshot {
    pub allowed: bool,
    pub reason: ReasonCode,
    pub rationale: String,
    pub control_mode: Option<ControlMode>,
    pub effective_tier: Option<Tier>,
    /// The single-use HITL approval token, surfaced exactly once here.
    pub approval_token: Option<String>,
    pub decision: Option<Decision>,
}

/// Filter for [`DecisionEngine::get_audit_trail`].
#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub event_type: Option<EventKind>,
    pub agent_id: Option<Uuid>,
    pub limit: usize,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            event_type: None,
            agent_id: None,
            limit: 50,
        }
    }
}

/// Orchestrates tier resolution, control derivation, the decision state
/// machine, and the ledger.
pub struct DecisionEngine {
    pack: Arc<PolicyPack>,
    projections: Projections,
    ledger: Arc<Ledger>,
    overrides: OverrideManager,
    adapter: Arc<dyn ExecutionAdapter>,
    extractor: Option<Arc<dyn SignalExtractor>>,
    config: EngineConfig,
}

impl DecisionEngine {
    /// Wire up an engine over injected collaborators.
    pub fn new(
        pack: Arc<PolicyPack>,
        storage: Arc<dyn Storage>,
        redactor: Arc<dyn Redact>,
        adapter: Arc<dyn ExecutionAdapter>,
        extractor: Option<Arc<dyn SignalExtractor>>,
        config: EngineConfig,
    ) -> Result<Self, GovernanceError> {
        let ledger = Arc::new(Ledger::open(storage.clone(), LEDGER_STREAM, redactor)?);
        let projections = Projections::new(storage);
        let overrides = OverrideManager::new(projections.clone(), ledger.clone());
        Ok(Self {
            pack,
            projections,
            ledger,
            overrides,
            adapter,
            extractor,
            config,
        })
    }

    // ── Agent lifecycle ──

    /// Register a new agent: normalize or infer its intent, resolve and
    /// freeze its tier, derive controls, and record everything.
    ///
    /// The agent starts as `requested` with design-time approval not yet
    /// granted.
    pub fn register_agent(&self, reg: AgentRegistration) -> Result<Agent, GovernanceError> {
        let name = reg.name.trim().to_string();
        if name.is_empty() {
            self.audit_rejection("register_agent", "", ReasonCode::InvalidRequest, "agent name is required");
            return Err(GovernanceError::Validation(
                "agent name is required".to_string(),
            ));
        }

        let intent = self.build_intent(&reg);
        let resolution = resolve(&intent, &self.pack);
        let tier = match reg.override_tier {
            Some(tier) => {
                if !self.pack.knows_tier(&tier) {
                    self.audit_rejection(
                        "register_agent",
                        "",
                        ReasonCode::InvalidRequest,
                        &format!("unknown override tier '{tier}'"),
                    );
                    return Err(GovernanceError::Validation(format!(
                        "unknown override tier '{tier}'"
                    )));
                }
                tier
            }
            None => resolution.tier.clone(),
        };
        let controls = controls_for(&tier, &self.pack)?;

        // The two lowest-ranked tiers stay read-only.
        let rank = self.pack.tier_rank(&tier).unwrap_or(0);
        let mut allowed_tools = vec!["read_only".to_string()];
        if rank > 1 {
            allowed_tools.push("write_via_gateway".to_string());
        }

        let agent = Agent {
            agent_id: Uuid::new_v4(),
            name,
            owner_hash: hash_identity(&reg.owner),
            problem_statement: reg.problem_statement,
            status: AgentStatus::Requested,
            approved: false,
            tier,
            controls,
            allowed_tools,
            intent,
            policy_version: self.pack.version.clone(),
            matched_rule_ids: resolution.matched_rule_ids,
            tier_reasons: resolution.reasons,
            created_at: Utc::now(),
            approved_at: None,
        };

        self.ledger
            .append(EventKind::AgentRegistered.as_str(), json!({ "agent": &agent }))?;
        self.projections.put_agent(&agent)?;
        tracing::info!(
            "registered agent {} ({}) at tier {}",
            agent.agent_id,
            agent.name,
            agent.tier
        );
        Ok(agent)
    }

    /// Grant design-time approval (requested/paused → approved).
    pub fn approve_agent(&self, agent_id: Uuid, approver: &str) -> Result<Agent, GovernanceError> {
        self.set_agent_status(agent_id, AgentStatus::Approved, approver)
    }

    /// Suspend an approved agent.
    pub fn pause_agent(&self, agent_id: Uuid, by: &str) -> Result<Agent, GovernanceError> {
        self.set_agent_status(agent_id, AgentStatus::Paused, by)
    }

    /// Resume a paused agent.
    pub fn resume_agent(&self, agent_id: Uuid, by: &str) -> Result<Agent, GovernanceError> {
        self.set_agent_status(agent_id, AgentStatus::Approved, by)
    }

    /// Emergency hard stop. Terminal.
    pub fn kill_agent(&self, agent_id: Uuid, by: &str) -> Result<Agent, GovernanceError> {
        self.set_agent_status(agent_id, AgentStatus::Killed, by)
    }

    /// Decommission an agent. Terminal.
    pub fn terminate_agent(&self, agent_id: Uuid, by: &str) -> Result<Agent, GovernanceError> {
        self.set_agent_status(agent_id, AgentStatus::Terminated, by)
    }

    fn set_agent_status(
        &self,
        agent_id: Uuid,
        next: AgentStatus,
        by: &str,
    ) -> Result<Agent, GovernanceError> {
        let mut agent = self.load_agent(agent_id)?;
        let from = agent.status;
        if let Err(err) = agent.transition(next) {
            self.audit_rejection(
                "agent_status",
                &agent_id.to_string(),
                ReasonCode::StateConflict,
                &format!("cannot transition from {from} to {next}"),
            );
            return Err(err);
        }

        self.ledger.append(
            EventKind::AgentStatusChanged.as_str(),
            json!({
                "agent_id": agent_id,
                "from": from,
                "to": next,
                "by_hash": hash_identity(by),
            }),
        )?;
        self.projections.put_agent(&agent)?;
        tracing::info!("agent {} {} → {}", agent_id, from, next);
        Ok(agent)
    }

    // ── Evaluation ──

    /// Gate an action request through the control-mode state machine.
    pub fn evaluate(&self, req: &ActionRequest) -> Result<DecisionSnapshot, GovernanceError> {
        let action = req.action.trim().to_lowercase();
        let target = req.target.trim().to_lowercase();
        if action.is_empty() || target.is_empty() {
            self.audit_rejection(
                "evaluate",
                &req.agent_id.to_string(),
                ReasonCode::InvalidRequest,
                "action and target are required",
            );
            return Err(GovernanceError::Validation(
                "action and target are required".to_string(),
            ));
        }

        let Some(agent) = self.projections.get_agent(req.agent_id)? else {
            self.audit_rejection(
                "evaluate",
                &req.agent_id.to_string(),
                ReasonCode::NotRegistered,
                "no agent with this id is registered",
            );
            return Err(GovernanceError::NotFound {
                kind: "agent",
                id: req.agent_id.to_string(),
            });
        };

        // Steps 2–4: agent-state gates. Denials here create no decision
        // record — the audit entry is the record.
        let state_denial = match agent.status {
            AgentStatus::Killed => Some((ReasonCode::AgentKilled, "agent was killed")),
            AgentStatus::Terminated => Some((ReasonCode::AgentTerminated, "agent was terminated")),
            AgentStatus::Paused => Some((ReasonCode::AgentPaused, "agent is paused")),
            _ if !agent.approved => Some((
                ReasonCode::ApprovalPending,
                "agent has not cleared design-time approval",
            )),
            _ => None,
        };
        if let Some((reason, rationale)) = state_denial {
            self.audit_gate(json!({
                "op": "evaluate",
                "agent_id": req.agent_id,
                "action": action,
                "target": target,
                "decision": "DENY",
                "reason": reason,
            }));
            return Ok(DecisionSnapshot {
                allowed: false,
                reason,
                rationale: rationale.to_string(),
                control_mode: None,
                effective_tier: None,
                approval_token: None,
                decision: None,
            });
        }

        // Step 5: an active, unexpired override beats the stored tier.
        let effective_tier = match self.overrides.active_override_for(req.agent_id)? {
            Some(active) => active.requested_tier,
            None => agent.tier.clone(),
        };

        // Step 6: derive controls. A miss here is a pack-load defect.
        let controls = match controls_for(&effective_tier, &self.pack) {
            Ok(controls) => controls,
            Err(err) => {
                self.audit_rejection(
                    "evaluate",
                    &req.agent_id.to_string(),
                    ReasonCode::PolicyUnavailable,
                    &err.to_string(),
                );
                return Err(err.into());
            }
        };

        // Step 7: control mode.
        let control_mode = if controls.approval_required
            || self.config.restricted_actions.contains(&action)
        {
            ControlMode::Hitl
        } else if self.config.write_actions.contains(&action) {
            ControlMode::Hotl
        } else {
            ControlMode::Auto
        };

        // Step 8: sandbox-only is absolute, independent of control mode.
        let environment = req
            .environment
            .clone()
            .unwrap_or_else(|| self.config.environment.clone());
        let sandbox_denied = controls.sandbox_only && environment != "sandbox";

        let (allowed, status, reason, rationale) = if sandbox_denied {
            (
                false,
                DecisionStatus::Denied,
                ReasonCode::SandboxOnly,
                format!(
                    "tier {effective_tier} is sandbox-only; environment '{environment}' is not sandbox"
                ),
            )
        } else {
            match control_mode {
                ControlMode::Auto => (
                    true,
                    DecisionStatus::Approved,
                    ReasonCode::AutoAllowed,
                    "low-risk action allowed automatically (AUTO)".to_string(),
                ),
                ControlMode::Hotl => (
                    true,
                    DecisionStatus::Approved,
                    ReasonCode::HotlReview,
                    "action allowed with human-on-the-loop review (HOTL)".to_string(),
                ),
                ControlMode::Hitl => (
                    false,
                    DecisionStatus::Pending,
                    ReasonCode::ApprovalRequired,
                    "action requires human-in-the-loop approval (HITL)".to_string(),
                ),
            }
        };

        // A pending HITL decision carries a single-use approval token.
        // Only its hash is stored; the raw token goes to the caller once.
        let (approval_token, token_sha, token_expires_at) =
            if !sandbox_denied && control_mode == ControlMode::Hitl {
                let token = new_approval_token();
                let sha = hasher::hash_str(&token);
                let expires =
                    Utc::now() + Duration::minutes(self.config.approval_token_ttl_minutes);
                (Some(token), Some(sha), Some(expires))
            } else {
                (None, None, None)
            };

        // Step 9: persist through the ledger, then the projection.
        let decision = Decision {
            decision_id: Uuid::new_v4(),
            agent_id: req.agent_id,
            action,
            target,
            tier: effective_tier.clone(),
            control_mode,
            allowed,
            status,
            reason,
            rationale: rationale.clone(),
            policy_version: agent.policy_version.clone(),
            matched_rule_ids: agent.matched_rule_ids.clone(),
            approval_token_sha: token_sha,
            token_expires_at,
            approver_hash: None,
            created_at: Utc::now(),
        };

        self.ledger
            .append(EventKind::DecisionCreated.as_str(), decision.ledger_payload())?;
        self.projections.put_decision(&decision)?;

        self.audit_gate(json!({
            "op": "evaluate",
            "agent_id": req.agent_id,
            "decision_id": decision.decision_id,
            "action": &decision.action,
            "target": &decision.target,
            "decision": if allowed { "ALLOW" } else { "DENY" },
            "reason": reason,
            "tier": &effective_tier,
            "control_mode": control_mode,
            "environment": environment,
            "policy_version": &decision.policy_version,
            "intent": &req.intent,
        }));

        Ok(DecisionSnapshot {
            allowed,
            reason,
            rationale,
            control_mode: Some(control_mode),
            effective_tier: Some(effective_tier),
            approval_token,
            decision: Some(decision),
        })
    }

    // ── Decision transitions ──

    /// Approve a pending HITL decision.
    ///
    /// When the decision carries an approval token, the matching raw token
    /// must be presented; it is consumed on success.
    pub fn approve_decision(
        &self,
        decision_id: Uuid,
        approver: &str,
        token: Option<&str>,
    ) -> Result<Decision, GovernanceError> {
        let mut decision = self.load_decision(decision_id)?;
        let from = decision.status;
        if let Err(err) = decision.transition(DecisionStatus::Approved) {
            self.audit_rejection(
                "approve_decision",
                &decision_id.to_string(),
                ReasonCode::StateConflict,
                &format!("cannot approve a decision in state {from}"),
            );
            return Err(err);
        }

        if let Some(expected_sha) = decision.approval_token_sha.clone() {
            let rejected = match token {
                None => Some("approval token required"),
                Some(_)
                    if decision
                        .token_expires_at
                        .is_some_and(|expiry| Utc::now() > expiry) =>
                {
                    Some("approval token expired")
                }
                Some(provided) if hasher::hash_str(provided) != expected_sha => {
                    Some("approval token mismatch")
                }
                Some(_) => None,
            };
            if let Some(detail) = rejected {
                self.audit_rejection(
                    "approve_decision",
                    &decision_id.to_string(),
                    ReasonCode::TokenInvalid,
                    detail,
                );
                return Err(GovernanceError::Validation(detail.to_string()));
            }
        }

        let by_hash = hash_identity(approver);
        decision.allowed = true;
        decision.reason = ReasonCode::DecisionApproved;
        decision.rationale = "approved by human reviewer".to_string();
        decision.approver_hash = Some(by_hash.clone());
        // Single use: the token never validates twice.
        decision.approval_token_sha = None;
        decision.token_expires_at = None;

        self.ledger.append(
            EventKind::DecisionStatusChanged.as_str(),
            json!({
                "decision_id": decision_id,
                "status": DecisionStatus::Approved,
                "by_hash": by_hash,
            }),
        )?;
        self.projections.put_decision(&decision)?;
        tracing::info!("decision {} approved", decision_id);
        Ok(decision)
    }

    /// Deny a pending decision with a reviewer note.
    pub fn deny_decision(
        &self,
        decision_id: Uuid,
        approver: &str,
        note: &str,
    ) -> Result<Decision, GovernanceError> {
        let mut decision = self.load_decision(decision_id)?;
        let from = decision.status;
        if let Err(err) = decision.transition(DecisionStatus::Denied) {
            self.audit_rejection(
                "deny_decision",
                &decision_id.to_string(),
                ReasonCode::StateConflict,
                &format!("cannot deny a decision in state {from}"),
            );
            return Err(err);
        }

        let by_hash = hash_identity(approver);
        decision.allowed = false;
        decision.reason = ReasonCode::DecisionDenied;
        if !note.trim().is_empty() {
            decision.rationale = note.trim().to_string();
        }
        decision.approver_hash = Some(by_hash.clone());
        decision.approval_token_sha = None;
        decision.token_expires_at = None;

        self.ledger.append(
            EventKind::DecisionStatusChanged.as_str(),
            json!({
                "decision_id": decision_id,
                "status": DecisionStatus::Denied,
                "by_hash": by_hash,
                "note": note,
            }),
        )?;
        self.projections.put_decision(&decision)?;
        tracing::info!("decision {} denied", decision_id);
        Ok(decision)
    }

    /// Execute an approved decision through the adapter.
    ///
    /// The agent's state is re-read here, not trusted from approval time —
    /// an agent can be killed between approval and execution. The decision
    /// is marked executed and audited whether the adapter succeeds or
    /// fails.
    pub fn execute(
        &self,
        decision_id: Uuid,
        payload: Value,
    ) -> Result<ExecutionResult, GovernanceError> {
        let mut decision = self.load_decision(decision_id)?;
        if decision.status != DecisionStatus::Approved {
            self.audit_rejection(
                "execute",
                &decision_id.to_string(),
                ReasonCode::StateConflict,
                &format!("cannot execute a decision in state {}", decision.status),
            );
            return Err(GovernanceError::StateConflict {
                kind: "decision",
                id: decision_id.to_string(),
                detail: format!("cannot execute a decision in state {}", decision.status),
            });
        }

        let agent = self
            .projections
            .get_agent(decision.agent_id)?
            .ok_or(GovernanceError::NotFound {
                kind: "agent",
                id: decision.agent_id.to_string(),
            })?;
        let halted = match agent.status {
            AgentStatus::Killed => Some(ReasonCode::AgentKilled),
            AgentStatus::Terminated => Some(ReasonCode::AgentTerminated),
            AgentStatus::Paused => Some(ReasonCode::AgentPaused),
            _ => None,
        };
        if let Some(reason) = halted {
            self.audit_rejection(
                "execute",
                &decision_id.to_string(),
                reason,
                &format!("agent is {}", agent.status),
            );
            return Err(GovernanceError::StateConflict {
                kind: "agent",
                id: agent.agent_id.to_string(),
                detail: format!("agent is {}", agent.status),
            });
        }

        let (adapter_ok, output) =
            match self
                .adapter
                .execute(&decision.target, &decision.action, &payload)
            {
                Ok(output) => (true, output),
                Err(err) => {
                    tracing::warn!("adapter failed for decision {}: {}", decision_id, err);
                    (false, json!({ "error": err.to_string() }))
                }
            };

        decision.transition(DecisionStatus::Executed)?;
        decision.reason = ReasonCode::Executed;

        self.ledger.append(
            EventKind::DecisionStatusChanged.as_str(),
            json!({
                "decision_id": decision_id,
                "status": DecisionStatus::Executed,
            }),
        )?;
        self.projections.put_decision(&decision)?;

        // Execution telemetry is soft: a failed append is logged, the
        // execution outcome stands.
        if let Err(err) = self.ledger.append(
            EventKind::Execution.as_str(),
            json!({
                "decision_id": decision_id,
                "agent_id": decision.agent_id,
                "action": &decision.action,
                "target": &decision.target,
                "tier": &decision.tier,
                "policy_version": &decision.policy_version,
                "adapter_ok": adapter_ok,
                "result": { "simulated": true },
            }),
        ) {
            tracing::error!("execution audit append failed: {err}");
        }

        Ok(ExecutionResult {
            decision_id,
            simulated: true,
            adapter_ok,
            output,
        })
    }

    // ── Overrides ──

    /// File a tier override request for an agent.
    pub fn request_override(
        &self,
        agent_id: Uuid,
        requested_tier: Tier,
        requested_by: &str,
        reason: &str,
    ) -> Result<OverrideRecord, GovernanceError> {
        if !self.pack.knows_tier(&requested_tier) {
            return Err(GovernanceError::Validation(format!(
                "unknown tier '{requested_tier}'"
            )));
        }
        self.load_agent(agent_id)?;
        self.overrides
            .request(agent_id, requested_tier, requested_by, reason)
    }

    /// Approve a pending override with a TTL (clamped to [1, 1440] min).
    pub fn approve_override(
        &self,
        override_id: Uuid,
        approved_by: &str,
        ttl_minutes: i64,
    ) -> Result<OverrideRecord, GovernanceError> {
        self.overrides.approve(override_id, approved_by, ttl_minutes)
    }

    /// Reject a pending override request.
    pub fn reject_override(
        &self,
        override_id: Uuid,
        rejected_by: &str,
    ) -> Result<OverrideRecord, GovernanceError> {
        self.overrides.reject(override_id, rejected_by)
    }

    /// Revoke an override (idempotent toward already-revoked).
    pub fn revoke_override(
        &self,
        override_id: Uuid,
        revoked_by: &str,
    ) -> Result<OverrideRecord, GovernanceError> {
        self.overrides.revoke(override_id, revoked_by)
    }

    /// The currently active override for an agent, if any.
    pub fn active_override_for(
        &self,
        agent_id: Uuid,
    ) -> Result<Option<OverrideRecord>, GovernanceError> {
        self.overrides.active_override_for(agent_id)
    }

    pub fn list_overrides(&self) -> Result<Vec<OverrideRecord>, GovernanceError> {
        self.overrides.list()
    }

    // ── Reads ──

    pub fn get_agent(&self, agent_id: Uuid) -> Result<Agent, GovernanceError> {
        self.load_agent(agent_id)
    }

    pub fn list_agents(&self) -> Result<Vec<Agent>, GovernanceError> {
        self.projections.list_agents()
    }

    pub fn get_decision(&self, decision_id: Uuid) -> Result<Decision, GovernanceError> {
        self.load_decision(decision_id)
    }

    pub fn list_decisions(&self) -> Result<Vec<Decision>, GovernanceError> {
        self.projections.list_decisions()
    }

    /// The filtered audit trail, newest event first.
    pub fn get_audit_trail(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<LedgerEvent>, GovernanceError> {
        let agent_str = filter.agent_id.map(|id| id.to_string());
        let mut events: Vec<LedgerEvent> = self
            .ledger
            .events()?
            .into_iter()
            .filter(|event| {
                if let Some(kind) = filter.event_type {
                    if event.event_type != kind.as_str() {
                        return false;
                    }
                }
                if let Some(agent_id) = &agent_str {
                    let payload_agent = event
                        .payload
                        .get("agent_id")
                        .and_then(Value::as_str)
                        .or_else(|| {
                            event
                                .payload
                                .get("agent")
                                .and_then(|a| a.get("agent_id"))
                                .and_then(Value::as_str)
                        });
                    if payload_agent != Some(agent_id.as_str()) {
                        return false;
                    }
                }
                true
            })
            .collect();
        events.reverse();
        events.truncate(filter.limit);
        Ok(events)
    }

    /// Recompute the full hash chain. Returns the verified event count.
    pub fn verify_ledger(&self) -> Result<usize, GovernanceError> {
        Ok(self.ledger.verify()?)
    }

    /// Replay the ledger into fresh projection records.
    pub fn rebuild_projections(&self) -> Result<RebuildCounts, GovernanceError> {
        self.projections.rebuild(&self.ledger)
    }

    /// The loaded policy pack (read-only).
    pub fn pack(&self) -> &PolicyPack {
        &self.pack
    }

    // ── Internals ──

    fn build_intent(&self, reg: &AgentRegistration) -> Intent {
        if !reg.actions.is_empty() || !reg.systems.is_empty() {
            return Intent::normalized(
                reg.actions.clone(),
                reg.systems.clone(),
                reg.data_sensitivity.unwrap_or_default(),
                reg.cross_border.unwrap_or(false),
            );
        }

        if !reg.problem_statement.trim().is_empty() {
            if let Some(extractor) = &self.extractor {
                match extractor.infer(&reg.problem_statement) {
                    Ok(mut partial) => {
                        // Explicitly supplied dimensions beat inference.
                        if let Some(sensitivity) = reg.data_sensitivity {
                            partial.data_sensitivity = Some(sensitivity);
                        }
                        if let Some(cross_border) = reg.cross_border {
                            partial.cross_border = Some(cross_border);
                        }
                        return partial.into_intent();
                    }
                    Err(err) => {
                        tracing::warn!(
                            "signal extraction failed; using conservative intent: {err}"
                        );
                    }
                }
            }
        }

        Intent::normalized(
            vec![],
            vec![],
            reg.data_sensitivity.unwrap_or_default(),
            reg.cross_border.unwrap_or(false),
        )
    }

    fn load_agent(&self, agent_id: Uuid) -> Result<Agent, GovernanceError> {
        self.projections
            .get_agent(agent_id)?
            .ok_or(GovernanceError::NotFound {
                kind: "agent",
                id: agent_id.to_string(),
            })
    }

    /// Load a decision from the projection, falling back to ledger
    /// reconstruction on a miss — the log is the source of truth, the
    /// projection is just the read path. A reconstructed record is written
    /// back to heal the projection. Token material is absent from ledger
    /// payloads and does not survive reconstruction.
    fn load_decision(&self, decision_id: Uuid) -> Result<Decision, GovernanceError> {
        if let Some(decision) = self.projections.get_decision(decision_id)? {
            return Ok(decision);
        }

        let id = decision_id.to_string();
        let created = self
            .ledger
            .latest_matching(EventKind::DecisionCreated.as_str(), |payload| {
                payload["decision"]["decision_id"] == id.as_str()
            })?
            .ok_or(GovernanceError::NotFound {
                kind: "decision",
                id: id.clone(),
            })?;
        let mut decision: Decision = serde_json::from_value(created["decision"].clone())
            .map_err(|e| GovernanceError::Corrupt {
                kind: "decision",
                detail: e.to_string(),
            })?;

        if let Some(change) = self
            .ledger
            .latest_matching(EventKind::DecisionStatusChanged.as_str(), |payload| {
                payload["decision_id"] == id.as_str()
            })?
        {
            decision.status = serde_json::from_value(change["status"].clone()).map_err(|e| {
                GovernanceError::Corrupt {
                    kind: "decision",
                    detail: e.to_string(),
                }
            })?;
            if let Some(by) = change["by_hash"].as_str() {
                decision.approver_hash = Some(by.to_string());
            }
        }

        tracing::warn!("decision {} reconstructed from the ledger", decision_id);
        self.projections.put_decision(&decision)?;
        Ok(decision)
    }

    /// Append a gate_decision audit event, soft-failing on storage errors:
    /// governance telemetry never blocks the primary decision path.
    fn audit_gate(&self, payload: Value) {
        if let Err(err) = self.ledger.append(EventKind::GateDecision.as_str(), payload) {
            tracing::error!("audit append failed; decision path continues: {err}");
        }
    }

    fn audit_rejection(&self, op: &str, id: &str, reason: ReasonCode, detail: &str) {
        self.audit_gate(json!({
            "op": op,
            "subject_id": id,
            "decision": "DENY",
            "reason": reason,
            "detail": detail,
        }));
    }
}

/// A 32-hex-char single-use token.
fn new_approval_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapter::SimulatedAdapter;
    use crate::signal::KeywordExtractor;
    use acp_ledger::AuditRedactor;
    use acp_policy::PolicyPack;
    use acp_store::MemoryStorage;

    pub(crate) const TEST_PACK: &str = r#"{
        "version": "v2-test",
        "generatedAt": "2026-01-27T00:00:00Z",
        "tiers": [
            {"tier": "A1", "defaultControls": {"logging": true}},
            {"tier": "A2", "defaultControls": {"logging": true}},
            {"tier": "A3", "defaultControls": {"logging": true, "auditLevel": "standard"}},
            {"tier": "A4", "defaultControls": {"logging": true, "humanInLoop": true, "auditLevel": "standard"}},
            {"tier": "A5", "defaultControls": {"logging": true, "piiRedaction": true, "approvalRequired": true, "sandboxOnly": true, "auditLevel": "full"}},
            {"tier": "A6", "defaultControls": {"logging": true, "piiRedaction": true, "approvalRequired": true, "sandboxOnly": true, "killSwitchRequired": true, "auditLevel": "full"}}
        ],
        "tiering": {
            "mergeStrategy": "MAX_TIER",
            "tierOrder": ["A1", "A2", "A3", "A4", "A5", "A6"],
            "rules": [
                {"id": "write-access", "if": {"actionsAny": ["update_record", "create_ticket"]}, "thenTier": "A4", "rationale": "write access to a system of record"},
                {"id": "pii-data", "if": {"dataSensitivityIn": ["PII"]}, "thenTier": "A5", "rationale": "handles personal data"},
                {"id": "cross-border", "if": {"crossBorder": true}, "thenTier": "A5", "rationale": "data leaves the jurisdiction"},
                {"id": "high-impact", "if": {"actionsAny": ["transfer_funds", "terminate_access"]}, "thenTier": "A6", "rationale": "irreversible high-impact action"}
            ]
        }
    }"#;

    pub(crate) fn test_engine() -> DecisionEngine {
        let pack = Arc::new(PolicyPack::from_json_str(TEST_PACK).unwrap());
        DecisionEngine::new(
            pack,
            Arc::new(MemoryStorage::new()),
            Arc::new(AuditRedactor::new().unwrap()),
            Arc::new(SimulatedAdapter::new()),
            Some(Arc::new(KeywordExtractor::new().unwrap())),
            EngineConfig::default(),
        )
        .unwrap()
    }

    fn register_defaults(engine: &DecisionEngine) -> Agent {
        engine
            .register_agent(AgentRegistration {
                name: "Demo Agent".to_string(),
                owner: "alice@example.com".to_string(),
                ..Default::default()
            })
            .unwrap()
    }

    fn register_pii_writer(engine: &DecisionEngine) -> Agent {
        engine
            .register_agent(AgentRegistration {
                name: "Record Updater".to_string(),
                owner: "alice@example.com".to_string(),
                actions: vec!["update_record".to_string()],
                systems: vec!["salesforce".to_string()],
                data_sensitivity: Some(DataSensitivity::Pii),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn registration_with_no_intent_defaults_conservatively() {
        let engine = test_engine();
        let agent = register_defaults(&engine);

        assert!(agent.intent.actions.contains("retrieve"));
        assert!(agent.intent.systems.contains("kb"));
        assert_eq!(agent.tier, Tier::from("A1"));
        assert_eq!(agent.status, AgentStatus::Requested);
        assert!(!agent.approved);
        assert_eq!(agent.allowed_tools, vec!["read_only"]);
        assert_eq!(agent.owner_hash.len(), 12);
    }

    #[test]
    fn registration_resolves_max_tier_across_rules() {
        let engine = test_engine();
        let agent = register_pii_writer(&engine);

        assert_eq!(agent.tier, Tier::from("A5"));
        assert!(agent.matched_rule_ids.contains(&"write-access".to_string()));
        assert!(agent.matched_rule_ids.contains(&"pii-data".to_string()));
        assert!(agent
            .allowed_tools
            .contains(&"write_via_gateway".to_string()));
        assert_eq!(agent.policy_version, "v2-test");
    }

    #[test]
    fn registration_honors_an_explicit_tier() {
        let engine = test_engine();
        let agent = engine
            .register_agent(AgentRegistration {
                name: "Pinned".to_string(),
                owner: "alice".to_string(),
                override_tier: Some(Tier::from("A3")),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(agent.tier, Tier::from("A3"));
    }

    #[test]
    fn registration_rejects_an_unknown_tier() {
        let engine = test_engine();
        let result = engine.register_agent(AgentRegistration {
            name: "Pinned".to_string(),
            owner: "alice".to_string(),
            override_tier: Some(Tier::from("Z9")),
            ..Default::default()
        });
        assert!(matches!(result, Err(GovernanceError::Validation(_))));
    }

    #[test]
    fn registration_infers_intent_from_problem_statement() {
        let engine = test_engine();
        let agent = engine
            .register_agent(AgentRegistration {
                name: "Claims Helper".to_string(),
                owner: "alice".to_string(),
                problem_statement:
                    "Update claim records containing medical PII for EU customers".to_string(),
                ..Default::default()
            })
            .unwrap();

        assert!(agent.intent.actions.contains("update_record"));
        assert_eq!(agent.intent.data_sensitivity, DataSensitivity::Pii);
        assert!(agent.intent.cross_border);
        assert_eq!(agent.tier, Tier::from("A5"));
    }

    #[test]
    fn evaluate_unknown_agent_is_not_found_and_audited() {
        let engine = test_engine();
        let result = engine.evaluate(&ActionRequest::new(Uuid::new_v4(), "retrieve", "kb"));
        assert!(matches!(result, Err(GovernanceError::NotFound { .. })));

        let trail = engine.get_audit_trail(&AuditFilter::default()).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].payload["reason"], "not_registered");
    }

    #[test]
    fn evaluate_before_design_approval_is_denied() {
        let engine = test_engine();
        let agent = register_defaults(&engine);

        let snapshot = engine
            .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
            .unwrap();
        assert!(!snapshot.allowed);
        assert_eq!(snapshot.reason, ReasonCode::ApprovalPending);
        assert!(snapshot.decision.is_none());
    }

    #[test]
    fn evaluate_paused_agent_appends_exactly_one_audit_event() {
        let engine = test_engine();
        let agent = register_defaults(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();
        engine.pause_agent(agent.agent_id, "boss").unwrap();

        let before = engine.ledger.events().unwrap().len();
        let snapshot = engine
            .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
            .unwrap();
        let after = engine.ledger.events().unwrap().len();

        assert!(!snapshot.allowed);
        assert_eq!(snapshot.reason, ReasonCode::AgentPaused);
        assert!(snapshot.decision.is_none());
        assert_eq!(after - before, 1);
    }

    #[test]
    fn killed_agent_is_denied_terminally() {
        let engine = test_engine();
        let agent = register_defaults(&engine);
        engine.kill_agent(agent.agent_id, "boss").unwrap();

        let snapshot = engine
            .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
            .unwrap();
        assert_eq!(snapshot.reason, ReasonCode::AgentKilled);

        // And the agent cannot come back.
        assert!(matches!(
            engine.approve_agent(agent.agent_id, "boss"),
            Err(GovernanceError::StateConflict { .. })
        ));
    }

    #[test]
    fn read_only_action_on_low_tier_is_auto() {
        let engine = test_engine();
        let agent = register_defaults(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();

        let snapshot = engine
            .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
            .unwrap();
        assert!(snapshot.allowed);
        assert_eq!(snapshot.control_mode, Some(ControlMode::Auto));
        let decision = snapshot.decision.unwrap();
        assert_eq!(decision.status, DecisionStatus::Approved);
        assert!(snapshot.approval_token.is_none());
    }

    #[test]
    fn write_action_gets_hotl_review() {
        let engine = test_engine();
        let agent = register_defaults(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();

        let snapshot = engine
            .evaluate(&ActionRequest::new(
                agent.agent_id,
                "update_record",
                "salesforce",
            ))
            .unwrap();
        assert!(snapshot.allowed);
        assert_eq!(snapshot.control_mode, Some(ControlMode::Hotl));
    }

    #[test]
    fn restricted_action_forces_hitl_even_on_low_tier() {
        let engine = test_engine();
        let agent = register_defaults(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();

        let snapshot = engine
            .evaluate(&ActionRequest::new(
                agent.agent_id,
                "transfer_funds",
                "payments",
            ))
            .unwrap();
        assert!(!snapshot.allowed);
        assert_eq!(snapshot.control_mode, Some(ControlMode::Hitl));
        assert_eq!(snapshot.reason, ReasonCode::ApprovalRequired);
        assert!(snapshot.approval_token.is_some());
    }

    #[test]
    fn approval_required_controls_force_hitl() {
        let engine = test_engine();
        let agent = register_pii_writer(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();

        let snapshot = engine
            .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
            .unwrap();
        // Tier A5 carries approvalRequired, so even a read is HITL.
        assert_eq!(snapshot.control_mode, Some(ControlMode::Hitl));
        assert_eq!(
            snapshot.decision.unwrap().status,
            DecisionStatus::Pending
        );
    }

    #[test]
    fn sandbox_only_denies_non_sandbox_environments() {
        let engine = test_engine();
        let agent = register_pii_writer(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();

        let mut req = ActionRequest::new(agent.agent_id, "retrieve", "kb");
        req.environment = Some("prod".to_string());
        let snapshot = engine.evaluate(&req).unwrap();

        assert!(!snapshot.allowed);
        assert_eq!(snapshot.reason, ReasonCode::SandboxOnly);
        let decision = snapshot.decision.unwrap();
        assert_eq!(decision.status, DecisionStatus::Denied);
        // Terminal at birth: no approval can resurrect it.
        assert!(matches!(
            engine.approve_decision(decision.decision_id, "boss", None),
            Err(GovernanceError::StateConflict { .. })
        ));
    }

    #[test]
    fn hitl_token_is_validated_and_single_use() {
        let engine = test_engine();
        let agent = register_pii_writer(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();

        let snapshot = engine
            .evaluate(&ActionRequest::new(
                agent.agent_id,
                "update_record",
                "salesforce",
            ))
            .unwrap();
        let decision_id = snapshot.decision.as_ref().unwrap().decision_id;
        let token = snapshot.approval_token.clone().unwrap();

        // Missing and wrong tokens are rejected.
        assert!(matches!(
            engine.approve_decision(decision_id, "boss", None),
            Err(GovernanceError::Validation(_))
        ));
        assert!(matches!(
            engine.approve_decision(decision_id, "boss", Some("wrong")),
            Err(GovernanceError::Validation(_))
        ));

        // The right token approves, once.
        let approved = engine
            .approve_decision(decision_id, "boss", Some(&token))
            .unwrap();
        assert_eq!(approved.status, DecisionStatus::Approved);
        assert!(approved.approval_token_sha.is_none());
    }

    #[test]
    fn approve_then_execute_then_deny_is_a_state_conflict() {
        let engine = test_engine();
        let agent = register_pii_writer(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();

        let snapshot = engine
            .evaluate(&ActionRequest::new(
                agent.agent_id,
                "update_record",
                "salesforce",
            ))
            .unwrap();
        let decision_id = snapshot.decision.as_ref().unwrap().decision_id;
        let token = snapshot.approval_token.clone().unwrap();

        engine
            .approve_decision(decision_id, "boss", Some(&token))
            .unwrap();
        let result = engine.execute(decision_id, json!({"field": "value"})).unwrap();
        assert!(result.simulated);
        assert!(result.adapter_ok);
        assert_eq!(
            engine.get_decision(decision_id).unwrap().status,
            DecisionStatus::Executed
        );

        assert!(matches!(
            engine.deny_decision(decision_id, "boss", "too late"),
            Err(GovernanceError::StateConflict { .. })
        ));
    }

    #[test]
    fn execute_rechecks_agent_state() {
        let engine = test_engine();
        let agent = register_defaults(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();

        let snapshot = engine
            .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
            .unwrap();
        let decision_id = snapshot.decision.unwrap().decision_id;

        // Kill between approval and execution.
        engine.kill_agent(agent.agent_id, "boss").unwrap();
        let result = engine.execute(decision_id, json!({}));
        assert!(matches!(
            result,
            Err(GovernanceError::StateConflict { kind: "agent", .. })
        ));
        // The decision was not marked executed.
        assert_eq!(
            engine.get_decision(decision_id).unwrap().status,
            DecisionStatus::Approved
        );
    }

    #[test]
    fn active_override_substitutes_the_tier() {
        let engine = test_engine();
        let agent = register_defaults(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();

        let request = engine
            .request_override(agent.agent_id, Tier::from("A5"), "alice", "pilot escalation")
            .unwrap();
        engine.approve_override(request.override_id, "boss", 60).unwrap();

        let snapshot = engine
            .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
            .unwrap();
        // A5 controls apply: approval required.
        assert_eq!(snapshot.effective_tier, Some(Tier::from("A5")));
        assert_eq!(snapshot.control_mode, Some(ControlMode::Hitl));

        // Revoking restores the stored tier.
        engine.revoke_override(request.override_id, "boss").unwrap();
        let snapshot = engine
            .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
            .unwrap();
        assert_eq!(snapshot.effective_tier, Some(Tier::from("A1")));
        assert_eq!(snapshot.control_mode, Some(ControlMode::Auto));
    }

    #[test]
    fn audit_trail_filters_by_type_and_agent() {
        let engine = test_engine();
        let agent = register_defaults(&engine);
        let other = register_defaults(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();
        engine.approve_agent(other.agent_id, "boss").unwrap();
        engine
            .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
            .unwrap();

        let gate_events = engine
            .get_audit_trail(&AuditFilter {
                event_type: Some(EventKind::GateDecision),
                agent_id: Some(agent.agent_id),
                limit: 10,
            })
            .unwrap();
        assert_eq!(gate_events.len(), 1);
        assert_eq!(gate_events[0].payload["decision"], "ALLOW");

        let registrations = engine
            .get_audit_trail(&AuditFilter {
                event_type: Some(EventKind::AgentRegistered),
                agent_id: None,
                limit: 10,
            })
            .unwrap();
        assert_eq!(registrations.len(), 2);
    }

    #[test]
    fn ledger_verifies_after_a_full_flow() {
        let engine = test_engine();
        let agent = register_pii_writer(&engine);
        engine.approve_agent(agent.agent_id, "boss").unwrap();
        let snapshot = engine
            .evaluate(&ActionRequest::new(
                agent.agent_id,
                "update_record",
                "salesforce",
            ))
            .unwrap();
        let decision_id = snapshot.decision.as_ref().unwrap().decision_id;
        let token = snapshot.approval_token.clone().unwrap();
        engine
            .approve_decision(decision_id, "boss", Some(&token))
            .unwrap();
        engine.execute(decision_id, json!({})).unwrap();

        let verified = engine.verify_ledger().unwrap();
        assert!(verified >= 6);
    }
}

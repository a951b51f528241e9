// governance_flow.rs — End-to-end governance flows over the public API.
//
// Exercises the full stack: policy pack → tier resolution → decision
// gating → hash-chained ledger → projections, including the file-backed
// storage path and concurrent appends.

use std::sync::Arc;

use acp_engine::{
    ActionRequest, AgentRegistration, AuditFilter, ControlMode, DecisionEngine, DecisionStatus,
    EngineConfig, EventKind, GovernanceError, KeywordExtractor, ReasonCode, SimulatedAdapter,
};
use acp_ledger::{AuditRedactor, Ledger};
use acp_policy::{resolve, DataSensitivity, Intent, PolicyPack, Tier};
use acp_store::{FileStorage, MemoryStorage, Storage};
use serde_json::json;

const PACK: &str = r#"{
    "version": "v2-flow",
    "generatedAt": "2026-01-27T00:00:00Z",
    "tiers": [
        {"tier": "A1", "defaultControls": {"logging": true}},
        {"tier": "A2", "defaultControls": {"logging": true}},
        {"tier": "A3", "defaultControls": {"logging": true}},
        {"tier": "A4", "defaultControls": {"logging": true, "humanInLoop": true}},
        {"tier": "A5", "defaultControls": {"logging": true, "piiRedaction": true, "approvalRequired": true, "auditLevel": "full"}},
        {"tier": "A6", "defaultControls": {"logging": true, "approvalRequired": true, "sandboxOnly": true, "killSwitchRequired": true, "auditLevel": "full"}}
    ],
    "tiering": {
        "mergeStrategy": "MAX_TIER",
        "tierOrder": ["A1", "A2", "A3", "A4", "A5", "A6"],
        "rules": [
            {"id": "rule-writes", "if": {"actionsAny": ["update_record"]}, "thenTier": "A4", "rationale": "record writes"},
            {"id": "rule-pii", "if": {"dataSensitivityIn": ["PII"]}, "thenTier": "A5", "rationale": "personal data"},
            {"id": "rule-impact", "if": {"actionsAny": ["transfer_funds"]}, "thenTier": "A6", "rationale": "funds movement"}
        ]
    }
}"#;

fn engine_on(storage: Arc<dyn Storage>) -> DecisionEngine {
    let pack = Arc::new(PolicyPack::from_json_str(PACK).unwrap());
    DecisionEngine::new(
        pack,
        storage,
        Arc::new(AuditRedactor::new().unwrap()),
        Arc::new(SimulatedAdapter::new()),
        Some(Arc::new(KeywordExtractor::new().unwrap())),
        EngineConfig::default(),
    )
    .unwrap()
}

fn engine() -> DecisionEngine {
    engine_on(Arc::new(MemoryStorage::new()))
}

// When both a write rule (A4) and a PII rule (A5) match, the
// resolved tier must be the higher of the two, with both rule ids listed.
#[test]
fn max_tier_merge_picks_the_higher_match() {
    let pack = PolicyPack::from_json_str(PACK).unwrap();
    let intent = Intent::normalized(
        vec!["update_record".to_string()],
        vec!["salesforce".to_string()],
        DataSensitivity::Pii,
        false,
    );

    let resolution = resolve(&intent, &pack);
    assert_eq!(resolution.tier, Tier::from("A5"));
    assert!(resolution.matched_rule_ids.contains(&"rule-writes".to_string()));
    assert!(resolution.matched_rule_ids.contains(&"rule-pii".to_string()));
}

// An empty problem statement with no explicit intent lands on
// the conservative default and a low tier.
#[test]
fn empty_registration_gets_conservative_defaults() {
    let engine = engine();
    let agent = engine
        .register_agent(AgentRegistration {
            name: "Blank Agent".to_string(),
            owner: "owner@example.com".to_string(),
            problem_statement: String::new(),
            ..Default::default()
        })
        .unwrap();

    assert!(agent.intent.actions.contains("retrieve"));
    assert!(agent.intent.systems.contains("kb"));
    assert_eq!(agent.intent.data_sensitivity, DataSensitivity::Internal);
    assert!(!agent.intent.cross_border);
    assert_eq!(agent.tier, Tier::from("A1"));
}

// A paused agent is denied with the stable reason code and
// exactly one audit event is appended by the call.
#[test]
fn paused_agent_denial_is_audited_once() {
    let engine = engine();
    let agent = engine
        .register_agent(AgentRegistration {
            name: "Paused Agent".to_string(),
            owner: "owner@example.com".to_string(),
            ..Default::default()
        })
        .unwrap();
    engine.approve_agent(agent.agent_id, "boss").unwrap();
    engine.pause_agent(agent.agent_id, "boss").unwrap();

    let trail_before = engine
        .get_audit_trail(&AuditFilter {
            limit: usize::MAX,
            ..Default::default()
        })
        .unwrap()
        .len();

    let snapshot = engine
        .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
        .unwrap();

    let trail_after = engine
        .get_audit_trail(&AuditFilter {
            limit: usize::MAX,
            ..Default::default()
        })
        .unwrap()
        .len();

    assert!(!snapshot.allowed);
    assert_eq!(snapshot.reason, ReasonCode::AgentPaused);
    assert_eq!(trail_after - trail_before, 1);
}

// A HITL decision is approved, executed, and then refuses any
// further transition.
#[test]
fn hitl_approve_execute_then_deny_conflicts() {
    let engine = engine();
    let agent = engine
        .register_agent(AgentRegistration {
            name: "PII Writer".to_string(),
            owner: "owner@example.com".to_string(),
            actions: vec!["update_record".to_string()],
            systems: vec!["salesforce".to_string()],
            data_sensitivity: Some(DataSensitivity::Pii),
            ..Default::default()
        })
        .unwrap();
    engine.approve_agent(agent.agent_id, "boss").unwrap();

    let snapshot = engine
        .evaluate(&ActionRequest::new(
            agent.agent_id,
            "update_record",
            "salesforce",
        ))
        .unwrap();
    assert_eq!(snapshot.control_mode, Some(ControlMode::Hitl));
    let decision_id = snapshot.decision.as_ref().unwrap().decision_id;
    let token = snapshot.approval_token.clone().unwrap();

    engine
        .approve_decision(decision_id, "reviewer@example.com", Some(&token))
        .unwrap();
    let result = engine
        .execute(decision_id, json!({"record": "42"}))
        .unwrap();
    assert!(result.simulated);

    let decision = engine.get_decision(decision_id).unwrap();
    assert_eq!(decision.status, DecisionStatus::Executed);

    assert!(matches!(
        engine.deny_decision(decision_id, "reviewer@example.com", "no"),
        Err(GovernanceError::StateConflict { .. })
    ));
}

// Concurrent appends never produce two events with the same
// prev_hash, and replaying the log reconstructs the same final state.
#[test]
fn concurrent_evaluations_keep_the_chain_fork_free() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let engine = Arc::new(engine_on(storage.clone()));

    let agent = engine
        .register_agent(AgentRegistration {
            name: "Busy Agent".to_string(),
            owner: "owner@example.com".to_string(),
            ..Default::default()
        })
        .unwrap();
    engine.approve_agent(agent.agent_id, "boss").unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        let agent_id = agent.agent_id;
        handles.push(std::thread::spawn(move || {
            for _ in 0..10 {
                engine
                    .evaluate(&ActionRequest::new(agent_id, "retrieve", "kb"))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // The chain validates and every prev_hash is unique.
    let ledger = Ledger::open(
        storage.clone(),
        "ledger",
        Arc::new(AuditRedactor::new().unwrap()),
    )
    .unwrap();
    let events = ledger.events().unwrap();
    let mut prev_hashes: Vec<&str> = events.iter().map(|e| e.prev_hash.as_str()).collect();
    let total = prev_hashes.len();
    prev_hashes.sort();
    prev_hashes.dedup();
    assert_eq!(prev_hashes.len(), total);
    ledger.verify().unwrap();

    // Replaying the log into a fresh projection reconstructs the same
    // final state: copy the log across, then rebuild.
    let fresh_storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    for (_, bytes) in storage.range_log("ledger", 0, usize::MAX).unwrap() {
        fresh_storage.append_to_log("ledger", &bytes).unwrap();
    }
    let rebuilt_engine = engine_on(fresh_storage);
    let counts = rebuilt_engine.rebuild_projections().unwrap();
    assert_eq!(counts.agents, 1);
    assert_eq!(counts.decisions, 40);

    let original_decisions = engine.list_decisions().unwrap();
    let rebuilt_decisions = rebuilt_engine.list_decisions().unwrap();
    assert_eq!(rebuilt_decisions.len(), original_decisions.len());
    for decision in &rebuilt_decisions {
        assert_eq!(decision.status, DecisionStatus::Approved);
    }
    let rebuilt_agent = rebuilt_engine.get_agent(agent.agent_id).unwrap();
    assert_eq!(rebuilt_agent.status, engine.get_agent(agent.agent_id).unwrap().status);
}

// A projection miss is healed from the ledger: the log is the source of
// truth, the keyed records are only the read path.
#[test]
fn decision_lookup_heals_from_the_ledger() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let engine = engine_on(storage.clone());

    let agent = engine
        .register_agent(AgentRegistration {
            name: "Heal Test".to_string(),
            owner: "owner@example.com".to_string(),
            ..Default::default()
        })
        .unwrap();
    engine.approve_agent(agent.agent_id, "boss").unwrap();
    let snapshot = engine
        .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
        .unwrap();
    let decision_id = snapshot.decision.unwrap().decision_id;

    // A storage holding only the log — no projection records at all.
    let log_only: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    for (_, bytes) in storage.range_log("ledger", 0, usize::MAX).unwrap() {
        log_only.append_to_log("ledger", &bytes).unwrap();
    }

    let healed = engine_on(log_only);
    let decision = healed.get_decision(decision_id).unwrap();
    assert_eq!(decision.status, DecisionStatus::Approved);
    assert_eq!(decision.agent_id, agent.agent_id);
}

#[test]
fn file_backed_engine_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("acp-data");

    let (agent_id, decision_id) = {
        let engine = engine_on(Arc::new(FileStorage::open(&root).unwrap()));
        let agent = engine
            .register_agent(AgentRegistration {
                name: "Persistent Agent".to_string(),
                owner: "owner@example.com".to_string(),
                ..Default::default()
            })
            .unwrap();
        engine.approve_agent(agent.agent_id, "boss").unwrap();
        let snapshot = engine
            .evaluate(&ActionRequest::new(agent.agent_id, "retrieve", "kb"))
            .unwrap();
        (agent.agent_id, snapshot.decision.unwrap().decision_id)
    };

    // A fresh engine over the same directory sees the same state and the
    // chain still validates.
    let engine = engine_on(Arc::new(FileStorage::open(&root).unwrap()));
    let agent = engine.get_agent(agent_id).unwrap();
    assert!(agent.approved);
    let decision = engine.get_decision(decision_id).unwrap();
    assert_eq!(decision.status, DecisionStatus::Approved);
    assert!(engine.verify_ledger().unwrap() >= 4);

    // And the chain keeps extending across the restart boundary.
    engine.execute(decision_id, json!({})).unwrap();
    engine.verify_ledger().unwrap();
}

#[test]
fn ledger_records_every_lifecycle_event_kind() {
    let engine = engine();
    let agent = engine
        .register_agent(AgentRegistration {
            name: "Full Flow".to_string(),
            owner: "owner@example.com".to_string(),
            actions: vec!["update_record".to_string()],
            data_sensitivity: Some(DataSensitivity::Pii),
            ..Default::default()
        })
        .unwrap();
    engine.approve_agent(agent.agent_id, "boss").unwrap();

    let request = engine
        .request_override(agent.agent_id, Tier::from("A2"), "alice", "demo")
        .unwrap();
    engine.approve_override(request.override_id, "boss", 30).unwrap();
    engine.revoke_override(request.override_id, "boss").unwrap();

    let snapshot = engine
        .evaluate(&ActionRequest::new(
            agent.agent_id,
            "update_record",
            "salesforce",
        ))
        .unwrap();
    let decision_id = snapshot.decision.as_ref().unwrap().decision_id;
    let token = snapshot.approval_token.clone().unwrap();
    engine.approve_decision(decision_id, "boss", Some(&token)).unwrap();
    engine.execute(decision_id, json!({})).unwrap();

    for kind in [
        EventKind::AgentRegistered,
        EventKind::AgentStatusChanged,
        EventKind::OverrideRequested,
        EventKind::OverrideApproved,
        EventKind::OverrideRevoked,
        EventKind::DecisionCreated,
        EventKind::DecisionStatusChanged,
        EventKind::GateDecision,
        EventKind::Execution,
    ] {
        let events = engine
            .get_audit_trail(&AuditFilter {
                event_type: Some(kind),
                agent_id: None,
                limit: usize::MAX,
            })
            .unwrap();
        assert!(!events.is_empty(), "no {} events recorded", kind);
    }
}

#[test]
fn owner_identities_are_pseudonymized_in_the_ledger() {
    let engine = engine();
    engine
        .register_agent(AgentRegistration {
            name: "Privacy Check".to_string(),
            owner: "carol@example.com".to_string(),
            ..Default::default()
        })
        .unwrap();

    let events = engine
        .get_audit_trail(&AuditFilter {
            event_type: Some(EventKind::AgentRegistered),
            agent_id: None,
            limit: 10,
        })
        .unwrap();
    let serialized = serde_json::to_string(&events).unwrap();
    assert!(!serialized.contains("carol@example.com"));
    assert_eq!(
        events[0].payload["agent"]["owner_hash"]
            .as_str()
            .unwrap()
            .len(),
        12
    );
}

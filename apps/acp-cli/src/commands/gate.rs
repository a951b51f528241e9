// gate.rs — Evaluate a gated action.

use acp_engine::{ActionRequest, DecisionEngine};

use super::parse_id;

pub fn execute(
    engine: &DecisionEngine,
    agent_id: &str,
    action: &str,
    target: &str,
    env: Option<&str>,
) -> anyhow::Result<()> {
    let mut request = ActionRequest::new(parse_id(agent_id)?, action, target);
    request.environment = env.map(str::to_string);

    let snapshot = engine.evaluate(&request)?;

    println!(
        "Decision: {}",
        if snapshot.allowed { "ALLOW" } else { "DENY" }
    );
    println!("  Reason:    {}", snapshot.reason);
    println!("  Rationale: {}", snapshot.rationale);
    if let Some(mode) = snapshot.control_mode {
        println!("  Mode:      {}", mode);
    }
    if let Some(tier) = &snapshot.effective_tier {
        println!("  Tier:      {}", tier);
    }
    if let Some(decision) = &snapshot.decision {
        println!("  Decision id: {}", decision.decision_id);
        println!("  Status:      {}", decision.status);
    }
    if let Some(token) = &snapshot.approval_token {
        println!("  Approval token (single use, shown once): {}", token);
    }
    Ok(())
}

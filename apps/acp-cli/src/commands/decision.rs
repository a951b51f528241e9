// decision.rs — Decision review and execution subcommands.

use clap::Subcommand;

use acp_engine::DecisionEngine;

use super::parse_id;

#[derive(Subcommand)]
pub enum DecisionCommands {
    /// List all decisions, newest first.
    List,
    /// Show one decision in full.
    Show { id: String },
    /// Approve a pending HITL decision.
    Approve {
        id: String,
        /// The single-use approval token issued at evaluation time.
        #[arg(long)]
        token: Option<String>,
    },
    /// Deny a pending decision.
    Deny {
        id: String,
        /// Reviewer note recorded with the denial.
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Execute an approved decision through the (simulated) adapter.
    Execute {
        id: String,
        /// JSON payload handed to the adapter.
        #[arg(long, default_value = "{}")]
        payload: String,
    },
}

pub fn execute(
    cmd: &DecisionCommands,
    engine: &DecisionEngine,
    user: &str,
) -> anyhow::Result<()> {
    match cmd {
        DecisionCommands::List => {
            let decisions = engine.list_decisions()?;
            if decisions.is_empty() {
                println!("No decisions recorded.");
                return Ok(());
            }
            for decision in decisions {
                println!(
                    "{}  {:<8}  {:<4}  {:<4}  {} on {}",
                    decision.decision_id,
                    decision.status,
                    decision.control_mode,
                    decision.tier,
                    decision.action,
                    decision.target
                );
            }
            Ok(())
        }
        DecisionCommands::Show { id } => {
            let decision = engine.get_decision(parse_id(id)?)?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(())
        }
        DecisionCommands::Approve { id, token } => {
            let decision = engine.approve_decision(parse_id(id)?, user, token.as_deref())?;
            println!("Decision {} is now {}", decision.decision_id, decision.status);
            Ok(())
        }
        DecisionCommands::Deny { id, note } => {
            let decision = engine.deny_decision(parse_id(id)?, user, note)?;
            println!("Decision {} is now {}", decision.decision_id, decision.status);
            Ok(())
        }
        DecisionCommands::Execute { id, payload } => {
            let payload: serde_json::Value = serde_json::from_str(payload)?;
            let result = engine.execute(parse_id(id)?, payload)?;
            println!(
                "Executed decision {} (simulated: {}, adapter_ok: {})",
                result.decision_id, result.simulated, result.adapter_ok
            );
            println!("{}", serde_json::to_string_pretty(&result.output)?);
            Ok(())
        }
    }
}

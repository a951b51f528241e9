// audit.rs — Audit ledger subcommands.

use clap::Subcommand;

use acp_engine::{AuditFilter, DecisionEngine, EventKind};

use super::parse_id;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Show recent ledger events, newest first.
    Tail {
        /// Maximum events to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Filter by event type (e.g., "gate_decision").
        #[arg(long = "type")]
        event_type: Option<String>,
        /// Filter by agent id.
        #[arg(long)]
        agent: Option<String>,
    },
    /// Recompute the whole hash chain and report tampering.
    Verify,
}

pub fn execute(cmd: &AuditCommands, engine: &DecisionEngine) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Tail {
            limit,
            event_type,
            agent,
        } => {
            let event_type = event_type
                .as_deref()
                .map(|raw| raw.parse::<EventKind>().map_err(anyhow::Error::msg))
                .transpose()?;
            let agent_id = agent.as_deref().map(parse_id).transpose()?;

            let events = engine.get_audit_trail(&AuditFilter {
                event_type,
                agent_id,
                limit: *limit,
            })?;
            if events.is_empty() {
                println!("No matching events.");
                return Ok(());
            }
            for event in events {
                println!(
                    "{}  {:<24}  {}",
                    event.ts.format("%Y-%m-%d %H:%M:%S"),
                    event.event_type,
                    serde_json::to_string(&event.payload)?
                );
            }
            Ok(())
        }
        AuditCommands::Verify => {
            let count = engine.verify_ledger()?;
            println!("Ledger OK — {} events verified, chain intact.", count);
            Ok(())
        }
    }
}

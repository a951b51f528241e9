// overrides.rs — Tier override subcommands.

use clap::Subcommand;

use acp_engine::DecisionEngine;
use acp_policy::Tier;

use super::parse_id;

#[derive(Subcommand)]
pub enum OverrideCommands {
    /// Request a temporary tier override for an agent.
    Request {
        /// Agent id.
        agent_id: String,
        /// Requested tier (e.g., "A2").
        tier: String,
        /// Why the override is needed.
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Approve a pending override with a TTL.
    Approve {
        id: String,
        /// Minutes until expiry, clamped to [1, 1440].
        #[arg(long, default_value_t = 60)]
        ttl: i64,
    },
    /// Reject a pending override request.
    Reject { id: String },
    /// Revoke an override (idempotent).
    Revoke { id: String },
    /// List all overrides, newest first.
    List,
}

pub fn execute(
    cmd: &OverrideCommands,
    engine: &DecisionEngine,
    user: &str,
) -> anyhow::Result<()> {
    match cmd {
        OverrideCommands::Request {
            agent_id,
            tier,
            reason,
        } => {
            let record =
                engine.request_override(parse_id(agent_id)?, Tier::from(tier.as_str()), user, reason)?;
            println!("Override requested: {}", record.override_id);
            println!("  Agent: {}", record.agent_id);
            println!("  Tier:  {}", record.requested_tier);
            println!("  Status: {}", record.status);
            Ok(())
        }
        OverrideCommands::Approve { id, ttl } => {
            let record = engine.approve_override(parse_id(id)?, user, *ttl)?;
            println!("Override {} is now {}", record.override_id, record.status);
            if let Some(expires) = record.expires_at {
                println!("  Expires: {}", expires);
            }
            Ok(())
        }
        OverrideCommands::Reject { id } => {
            let record = engine.reject_override(parse_id(id)?, user)?;
            println!("Override {} is now {}", record.override_id, record.status);
            Ok(())
        }
        OverrideCommands::Revoke { id } => {
            let record = engine.revoke_override(parse_id(id)?, user)?;
            println!("Override {} is now {}", record.override_id, record.status);
            Ok(())
        }
        OverrideCommands::List => {
            let records = engine.list_overrides()?;
            if records.is_empty() {
                println!("No overrides recorded.");
                return Ok(());
            }
            for record in records {
                println!(
                    "{}  {:<8}  {:<4}  agent {}",
                    record.override_id, record.status, record.requested_tier, record.agent_id
                );
            }
            Ok(())
        }
    }
}

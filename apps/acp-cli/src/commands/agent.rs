// agent.rs — Agent registry subcommands.

use clap::Subcommand;

use acp_engine::{AgentRegistration, DecisionEngine};
use acp_policy::{DataSensitivity, Tier};

use super::parse_id;

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Register a new agent (status starts as "requested").
    Register {
        /// Human-readable agent name.
        #[arg(long)]
        name: String,
        /// Owner identity (stored pseudonymized).
        #[arg(long)]
        owner: String,
        /// Free-text problem statement; seeds the intent when no explicit
        /// actions/systems are given.
        #[arg(long, default_value = "")]
        problem: String,
        /// Declared action (repeatable).
        #[arg(long = "action")]
        actions: Vec<String>,
        /// Declared target system (repeatable).
        #[arg(long = "system")]
        systems: Vec<String>,
        /// Data sensitivity: PUBLIC, INTERNAL, CONFIDENTIAL, or PII.
        #[arg(long)]
        sensitivity: Option<String>,
        /// Whether data crosses a border.
        #[arg(long)]
        cross_border: bool,
        /// Pin the tier instead of resolving it from rules.
        #[arg(long)]
        tier: Option<String>,
    },
    /// List all registered agents.
    List,
    /// Show one agent in full.
    Show { id: String },
    /// Grant design-time approval.
    Approve { id: String },
    /// Pause an approved agent.
    Pause { id: String },
    /// Resume a paused agent.
    Resume { id: String },
    /// Emergency hard stop (terminal).
    Kill { id: String },
    /// Decommission an agent (terminal).
    Terminate { id: String },
}

pub fn execute(
    cmd: &AgentCommands,
    engine: &DecisionEngine,
    user: &str,
) -> anyhow::Result<()> {
    match cmd {
        AgentCommands::Register {
            name,
            owner,
            problem,
            actions,
            systems,
            sensitivity,
            cross_border,
            tier,
        } => {
            let data_sensitivity = sensitivity
                .as_deref()
                .map(parse_sensitivity)
                .transpose()?;
            let agent = engine.register_agent(AgentRegistration {
                name: name.clone(),
                owner: owner.clone(),
                problem_statement: problem.clone(),
                actions: actions.clone(),
                systems: systems.clone(),
                data_sensitivity,
                cross_border: if *cross_border { Some(true) } else { None },
                override_tier: tier.as_deref().map(Tier::from),
            })?;

            println!("Agent registered: {}", agent.agent_id);
            println!("  Name:    {}", agent.name);
            println!("  Status:  {} (awaiting approval)", agent.status);
            println!("  Tier:    {}", agent.tier);
            for reason in &agent.tier_reasons {
                println!("    - {}", reason);
            }
            println!("  Tools:   {}", agent.allowed_tools.join(", "));
            println!("  Policy:  {}", agent.policy_version);
            Ok(())
        }
        AgentCommands::List => {
            let agents = engine.list_agents()?;
            if agents.is_empty() {
                println!("No agents registered.");
                return Ok(());
            }
            for agent in agents {
                println!(
                    "{}  {:<10}  {:<4}  {}",
                    agent.agent_id, agent.status, agent.tier, agent.name
                );
            }
            Ok(())
        }
        AgentCommands::Show { id } => {
            let agent = engine.get_agent(parse_id(id)?)?;
            println!("{}", serde_json::to_string_pretty(&agent)?);
            Ok(())
        }
        AgentCommands::Approve { id } => {
            let agent = engine.approve_agent(parse_id(id)?, user)?;
            println!("Agent {} is now {}", agent.agent_id, agent.status);
            Ok(())
        }
        AgentCommands::Pause { id } => {
            let agent = engine.pause_agent(parse_id(id)?, user)?;
            println!("Agent {} is now {}", agent.agent_id, agent.status);
            Ok(())
        }
        AgentCommands::Resume { id } => {
            let agent = engine.resume_agent(parse_id(id)?, user)?;
            println!("Agent {} is now {}", agent.agent_id, agent.status);
            Ok(())
        }
        AgentCommands::Kill { id } => {
            let agent = engine.kill_agent(parse_id(id)?, user)?;
            println!("Agent {} is now {}", agent.agent_id, agent.status);
            Ok(())
        }
        AgentCommands::Terminate { id } => {
            let agent = engine.terminate_agent(parse_id(id)?, user)?;
            println!("Agent {} is now {}", agent.agent_id, agent.status);
            Ok(())
        }
    }
}

fn parse_sensitivity(raw: &str) -> anyhow::Result<DataSensitivity> {
    match raw.to_uppercase().as_str() {
        "PUBLIC" => Ok(DataSensitivity::Public),
        "INTERNAL" => Ok(DataSensitivity::Internal),
        "CONFIDENTIAL" => Ok(DataSensitivity::Confidential),
        "PII" => Ok(DataSensitivity::Pii),
        other => anyhow::bail!(
            "unknown sensitivity '{other}' (expected PUBLIC, INTERNAL, CONFIDENTIAL, or PII)"
        ),
    }
}

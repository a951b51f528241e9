//! # acp-cli
//!
//! Command-line interface for the Agent Control Plane.
//!
//! Drives the full governance lifecycle against a file-backed store:
//! - `acp agent register/approve/pause/kill/...` — agent registry
//! - `acp gate <agent-id> <action> <target>` — evaluate a gated action
//! - `acp decision approve/deny/execute` — HITL decision workflow
//! - `acp override request/approve/revoke` — time-bounded tier overrides
//! - `acp audit tail/verify` — inspect the tamper-evident ledger

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use acp_engine::{DecisionEngine, EngineConfig, KeywordExtractor, SimulatedAdapter};
use acp_ledger::AuditRedactor;
use acp_policy::{ConfigSource, FileConfigSource};
use acp_store::FileStorage;

/// Agent Control Plane CLI — govern agents, gate actions, audit everything.
#[derive(Parser)]
#[command(name = "acp", version, about)]
struct Cli {
    /// Data directory for the store and ledger.
    #[arg(long, default_value = ".acp")]
    data_dir: PathBuf,

    /// Path to the policy pack JSON.
    #[arg(long, default_value = "config/policy_pack.json")]
    policy: PathBuf,

    /// Optional engine config TOML (environment, action sets, token TTL).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Identity performing governance actions (pseudonymized in records).
    #[arg(long, default_value = "operator")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the agent registry.
    Agent {
        #[command(subcommand)]
        command: commands::agent::AgentCommands,
    },
    /// Evaluate a gated action for an agent.
    Gate {
        /// Agent id.
        agent_id: String,
        /// Action to gate (e.g., "retrieve", "update_record").
        action: String,
        /// Target system (e.g., "kb", "salesforce").
        target: String,
        /// Declared environment (defaults to the engine config's).
        #[arg(long)]
        env: Option<String>,
    },
    /// Review and execute decisions.
    Decision {
        #[command(subcommand)]
        command: commands::decision::DecisionCommands,
    },
    /// Manage tier overrides.
    Override {
        #[command(subcommand)]
        command: commands::overrides::OverrideCommands,
    },
    /// Inspect the audit ledger.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let pack = Arc::new(
        FileConfigSource::new(&cli.policy)
            .load_policy_pack()
            .with_context(|| format!("loading policy pack from {}", cli.policy.display()))?,
    );
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading engine config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    tracing::debug!(
        "data dir {}, policy pack {}",
        cli.data_dir.display(),
        cli.policy.display()
    );
    let storage = Arc::new(FileStorage::open(&cli.data_dir)?);
    let engine = DecisionEngine::new(
        pack,
        storage,
        Arc::new(AuditRedactor::new()?),
        Arc::new(SimulatedAdapter::new()),
        Some(Arc::new(KeywordExtractor::new()?)),
        config,
    )?;

    match &cli.command {
        Commands::Agent { command } => commands::agent::execute(command, &engine, &cli.user),
        Commands::Gate {
            agent_id,
            action,
            target,
            env,
        } => commands::gate::execute(&engine, agent_id, action, target, env.as_deref()),
        Commands::Decision { command } => {
            commands::decision::execute(command, &engine, &cli.user)
        }
        Commands::Override { command } => {
            commands::overrides::execute(command, &engine, &cli.user)
        }
        Commands::Audit { command } => commands::audit::execute(command, &engine),
    }
}

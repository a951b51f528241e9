// commands/ — one module per top-level subcommand.

pub mod agent;
pub mod audit;
pub mod decision;
pub mod gate;
pub mod overrides;

use anyhow::Context;
use uuid::Uuid;

/// Parse a CLI-supplied id.
pub fn parse_id(raw: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("'{raw}' is not a valid id"))
}

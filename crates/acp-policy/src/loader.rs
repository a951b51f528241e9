// loader.rs — ConfigSource: where policy packs come from.
//
// The engine loads exactly one pack per process lifetime and treats it as
// read-only afterwards. Loading must either produce a fully validated pack
// or fail with a descriptive error — never a partially valid pack.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PolicyError;
use crate::pack::PolicyPack;

/// A source of policy packs.
pub trait ConfigSource {
    /// Load and validate the pack. Fails fast on any missing required
    /// field or internal inconsistency.
    fn load_policy_pack(&self) -> Result<PolicyPack, PolicyError>;
}

/// Loads the pack from a JSON file on disk.
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn load_policy_pack(&self) -> Result<PolicyPack, PolicyError> {
        let json = fs::read_to_string(&self.path).map_err(|source| PolicyError::Io {
            path: self.path.clone(),
            source,
        })?;
        let pack = PolicyPack::from_json_str(&json)?;
        tracing::info!(
            "loaded policy pack version {} ({} tiers, {} rules)",
            pack.version,
            pack.tier_order.len(),
            pack.rules.len()
        );
        Ok(pack)
    }
}

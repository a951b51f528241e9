// controls.rs — Tier → control bundle derivation.

use crate::error::PolicyError;
use crate::pack::{ControlBundle, PolicyPack, Tier};

/// Look up the default controls a tier carries.
///
/// Fails with [`PolicyError::UnknownTier`] when the pack has no defaults
/// for the tier. For a validated pack this is unreachable on the resolver
/// path; hitting it means the pack load was defective, not that user input
/// was bad.
pub fn controls_for(tier: &Tier, pack: &PolicyPack) -> Result<ControlBundle, PolicyError> {
    pack.tier_defaults(tier)
        .cloned()
        .ok_or_else(|| PolicyError::UnknownTier {
            tier: tier.to_string(),
        })
}

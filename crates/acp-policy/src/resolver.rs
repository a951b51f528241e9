// resolver.rs — Deterministic tier resolution (MAX_TIER merge).
//
// Pure function of (intent, pack): no clock, no randomness, no I/O. Rules
// are visited in pack order, but order only affects the matched-id list —
// the chosen tier is the rank-maximum over all matches, so reordering the
// rules can never change it.

use crate::intent::Intent;
use crate::pack::{PolicyPack, Tier};

/// The outcome of tier resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierResolution {
    /// The highest-ranked tier among all matching rules, or the pack's
    /// lowest tier when nothing matched.
    pub tier: Tier,
    /// Ids of every rule that matched, in pack order.
    pub matched_rule_ids: Vec<String>,
    /// One `"<rule-id>: <rationale>"` line per match, for audit display.
    pub reasons: Vec<String>,
}

/// Resolve the risk tier for an intent against a policy pack.
///
/// No rule matching is not an error — it resolves to the lowest tier with
/// an empty matched list.
pub fn resolve(intent: &Intent, pack: &PolicyPack) -> TierResolution {
    let mut best = pack.lowest_tier().clone();
    let mut best_rank = pack.tier_rank(&best).unwrap_or(0);
    let mut matched_rule_ids = Vec::new();
    let mut reasons = Vec::new();

    for rule in &pack.rules {
        if !rule.when.matches(intent) {
            continue;
        }

        matched_rule_ids.push(rule.id.clone());
        reasons.push(format!("{}: {}", rule.id, rule.rationale));

        // Unranked tiers are unreachable for a validated pack; treat as
        // lowest rather than panicking.
        let rank = pack.tier_rank(&rule.then_tier).unwrap_or(0);
        if rank > best_rank {
            best = rule.then_tier.clone();
            best_rank = rank;
        }
    }

    TierResolution {
        tier: best,
        matched_rule_ids,
        reasons,
    }
}

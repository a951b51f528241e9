// pack.rs — Policy pack: tiers, rules, and per-tier default controls.
//
// The pack is an externally authored JSON document, loaded once per process
// and shared read-only afterwards. Field names follow the pack wire format
// (camelCase) rather than Rust convention because the document is written
// by policy owners, not by this codebase.
//
// Validation is strict: a pack that references a tier missing from
// tierOrder, repeats a rule id, or omits defaults for a resolvable tier is
// rejected at load time.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::intent::{DataSensitivity, Intent};

/// A risk tier name (e.g., "A1" … "A6").
///
/// Deliberately not `Ord`: tiers are ranked only by their position in the
/// pack's `tierOrder`, never by string comparison. Use
/// [`PolicyPack::tier_rank`] to compare two tiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(String);

impl Tier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Tier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How much detail the audit trail records for actions at a tier.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    #[default]
    Basic,
    Standard,
    Full,
}

/// The operational controls a tier carries.
///
/// A closed struct rather than a free-form JSON object: an unknown control
/// in a pack document is a load error, not a silently ignored field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ControlBundle {
    pub logging: bool,
    pub pii_redaction: bool,
    pub human_in_loop: bool,
    pub approval_required: bool,
    pub sandbox_only: bool,
    pub rate_limit_per_min: Option<u32>,
    pub audit_level: AuditLevel,
    pub kill_switch_required: bool,
}

/// The condition block of a tiering rule. Conditions are AND-combined; an
/// absent condition is vacuously true for its dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleConditions {
    /// Matches when the intent's action set intersects this set.
    pub actions_any: Option<Vec<String>>,
    /// Matches when the intent's action set is non-empty and a subset of
    /// this set. An empty intent never satisfies `actionsOnly` — otherwise
    /// an empty action list would spuriously match a permissive rule.
    pub actions_only: Option<Vec<String>>,
    /// Matches when the intent's system set intersects this set.
    pub systems_any: Option<Vec<String>>,
    /// Matches when the intent's sensitivity is one of these.
    pub data_sensitivity_in: Option<Vec<DataSensitivity>>,
    /// Matches when the intent's cross-border flag equals this.
    pub cross_border: Option<bool>,
}

impl RuleConditions {
    /// Evaluate all conditions against an intent.
    pub fn matches(&self, intent: &Intent) -> bool {
        if let Some(any) = &self.actions_any {
            if !any.iter().any(|a| intent.actions.contains(a)) {
                return false;
            }
        }
        if let Some(only) = &self.actions_only {
            if intent.actions.is_empty() {
                return false;
            }
            if !intent.actions.iter().all(|a| only.contains(a)) {
                return false;
            }
        }
        if let Some(any) = &self.systems_any {
            if !any.iter().any(|s| intent.systems.contains(s)) {
                return false;
            }
        }
        if let Some(sensitivities) = &self.data_sensitivity_in {
            if !sensitivities.contains(&intent.data_sensitivity) {
                return false;
            }
        }
        if let Some(cross_border) = self.cross_border {
            if intent.cross_border != cross_border {
                return false;
            }
        }
        true
    }

    /// Lowercase every action/system entry so matching is case-insensitive
    /// against normalized intents.
    fn normalize(&mut self) {
        for list in [&mut self.actions_any, &mut self.actions_only, &mut self.systems_any] {
            if let Some(entries) = list {
                for entry in entries.iter_mut() {
                    *entry = entry.trim().to_lowercase();
                }
            }
        }
    }
}

/// A single tiering rule: when the conditions hold, the intent is at least
/// `thenTier` risky.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    #[serde(rename = "if", default)]
    pub when: RuleConditions,
    pub then_tier: Tier,
    /// Human-readable explanation surfaced in tiering explanations.
    #[serde(default)]
    pub rationale: String,
}

/// Strategy for combining multiple matching rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MergeStrategy {
    /// The highest-ranked tier among all matches wins.
    #[serde(rename = "MAX_TIER")]
    MaxTier,
}

// ── Wire-format structs (what the JSON document actually looks like) ──

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackFile {
    #[serde(default)]
    version: String,
    #[serde(default)]
    generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    tiers: Vec<TierEntry>,
    tiering: Option<TieringSection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TierEntry {
    tier: Tier,
    #[serde(default)]
    default_controls: ControlBundle,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TieringSection {
    merge_strategy: MergeStrategy,
    #[serde(default)]
    tier_order: Vec<Tier>,
    #[serde(default)]
    rules: Vec<Rule>,
}

/// An immutable, versioned policy pack: ordered tiers, ordered rules, and
/// per-tier default controls.
#[derive(Debug, Clone)]
pub struct PolicyPack {
    pub version: String,
    pub generated_at: Option<DateTime<Utc>>,
    pub merge_strategy: MergeStrategy,
    pub tier_order: Vec<Tier>,
    pub rules: Vec<Rule>,
    tier_defaults: HashMap<Tier, ControlBundle>,
}

impl PolicyPack {
    /// Parse and validate a pack from its JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, PolicyError> {
        let file: PackFile = serde_json::from_str(json)?;
        Self::validate(file)
    }

    fn validate(file: PackFile) -> Result<Self, PolicyError> {
        if file.version.trim().is_empty() {
            return Err(PolicyError::MissingField {
                field: "version".to_string(),
            });
        }
        if file.tiers.is_empty() {
            return Err(PolicyError::MissingField {
                field: "tiers".to_string(),
            });
        }
        let Some(mut tiering) = file.tiering else {
            return Err(PolicyError::MissingField {
                field: "tiering".to_string(),
            });
        };
        if tiering.rules.is_empty() {
            return Err(PolicyError::MissingField {
                field: "tiering.rules".to_string(),
            });
        }
        if tiering.tier_order.is_empty() {
            return Err(PolicyError::MissingField {
                field: "tiering.tierOrder".to_string(),
            });
        }

        // tierOrder must be a duplicate-free total order.
        let mut seen = HashSet::new();
        for tier in &tiering.tier_order {
            if !seen.insert(tier.clone()) {
                return Err(PolicyError::DuplicateTier {
                    tier: tier.to_string(),
                });
            }
        }

        // Every tier referenced anywhere must appear in tierOrder.
        for entry in &file.tiers {
            if !seen.contains(&entry.tier) {
                return Err(PolicyError::UnorderedTier {
                    tier: entry.tier.to_string(),
                    referenced_by: "tiers[]".to_string(),
                });
            }
        }
        let mut rule_ids = HashSet::new();
        for rule in &mut tiering.rules {
            if !rule_ids.insert(rule.id.clone()) {
                return Err(PolicyError::DuplicateRuleId {
                    id: rule.id.clone(),
                });
            }
            if !seen.contains(&rule.then_tier) {
                return Err(PolicyError::UnorderedTier {
                    tier: rule.then_tier.to_string(),
                    referenced_by: format!("rule '{}'", rule.id),
                });
            }
            rule.when.normalize();
        }

        let tier_defaults: HashMap<Tier, ControlBundle> = file
            .tiers
            .into_iter()
            .map(|entry| (entry.tier, entry.default_controls))
            .collect();

        // Control derivation must be total over resolvable tiers: the
        // lowest tier and every rule target need a defaults entry.
        let mut resolvable: Vec<&Tier> = vec![&tiering.tier_order[0]];
        resolvable.extend(tiering.rules.iter().map(|r| &r.then_tier));
        for tier in resolvable {
            if !tier_defaults.contains_key(tier) {
                return Err(PolicyError::MissingTierDefaults {
                    tier: tier.to_string(),
                });
            }
        }

        Ok(Self {
            version: file.version,
            generated_at: file.generated_at,
            merge_strategy: tiering.merge_strategy,
            tier_order: tiering.tier_order,
            rules: tiering.rules,
            tier_defaults,
        })
    }

    /// Position of a tier in the pack's order, lowest risk first.
    pub fn tier_rank(&self, tier: &Tier) -> Option<usize> {
        self.tier_order.iter().position(|t| t == tier)
    }

    /// The lowest-risk tier in the pack.
    pub fn lowest_tier(&self) -> &Tier {
        // Non-empty by validation.
        &self.tier_order[0]
    }

    /// Whether the pack defines this tier in its order.
    pub fn knows_tier(&self, tier: &Tier) -> bool {
        self.tier_rank(tier).is_some()
    }

    /// The default controls for a tier, if the pack defines any.
    pub fn tier_defaults(&self, tier: &Tier) -> Option<&ControlBundle> {
        self.tier_defaults.get(tier)
    }
}

// signal.rs — Advisory intent signal extraction.
//
// A SignalExtractor may seed an Intent from a free-text problem statement
// when the caller supplied no structured actions/systems. It is never
// authoritative: tier computation runs only on deterministic rules, and an
// extraction failure degrades to the maximally conservative intent rather
// than blocking tiering.

use regex::Regex;
use thiserror::Error;

use acp_policy::{DataSensitivity, PartialIntent};

/// A signal extraction failure. Callers fall back to the conservative
/// default intent.
#[derive(Debug, Error)]
#[error("signal extraction failed: {0}")]
pub struct SignalError(pub String);

/// Infers a partial intent from a free-text problem statement.
pub trait SignalExtractor: Send + Sync {
    fn infer(&self, problem_statement: &str) -> Result<PartialIntent, SignalError>;
}

/// Deterministic keyword-based extractor.
///
/// Scans the statement for write verbs, HR-system markers, PII markers,
/// and cross-border markers. Deliberately coarse: its only job is to keep
/// obviously risky statements from landing on the read-only default.
pub struct KeywordExtractor {
    write_verbs: Regex,
    hr_systems: Regex,
    pii_markers: Regex,
    cross_border: Regex,
}

impl KeywordExtractor {
    pub fn new() -> Result<Self, SignalError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| SignalError(format!("bad pattern: {e}")))
        };
        Ok(Self {
            write_verbs: compile(
                r"\b(update|write|create|submit|change|delete|approve|send)\b",
            )?,
            hr_systems: compile(r"\b(workday|hr|employee|onboarding)\b")?,
            pii_markers: compile(r"\b(pii|sin|ssn|passport|medical|claim|benefit)\b")?,
            cross_border: compile(
                r"\b(cross[- ]border|international|outside canada|eu|uk|us)\b",
            )?,
        })
    }
}

impl SignalExtractor for KeywordExtractor {
    fn infer(&self, problem_statement: &str) -> Result<PartialIntent, SignalError> {
        let text = problem_statement.to_lowercase();
        let mut partial = PartialIntent::default();

        if self.write_verbs.is_match(&text) {
            partial.actions = vec!["update_record".to_string()];
            partial.systems = vec!["salesforce".to_string()];
        }
        if self.hr_systems.is_match(&text) {
            partial.systems = vec!["workday".to_string()];
        }
        if self.pii_markers.is_match(&text) {
            partial.data_sensitivity = Some(DataSensitivity::Pii);
        }
        if self.cross_border.is_match(&text) {
            partial.cross_border = Some(true);
        }

        Ok(partial)
    }
}

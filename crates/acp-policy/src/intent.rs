// intent.rs — Declared agent intent.
//
// An Intent is the transient input to tier resolution: what the agent wants
// to do (actions), where (systems), against what kind of data, and whether
// data crosses a border. It is never persisted on its own — it travels
// embedded in whichever ledger event references it.
//
// Normalization is conservative: an empty action or system set defaults to
// the read-only {"retrieve"}/{"kb"} baseline rather than staying empty.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Sensitivity classification of the data an agent touches.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSensitivity {
    Public,
    #[default]
    Internal,
    Confidential,
    Pii,
}

impl std::fmt::Display for DataSensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSensitivity::Public => write!(f, "PUBLIC"),
            DataSensitivity::Internal => write!(f, "INTERNAL"),
            DataSensitivity::Confidential => write!(f, "CONFIDENTIAL"),
            DataSensitivity::Pii => write!(f, "PII"),
        }
    }
}

/// A declared intent: what an agent proposes to do.
///
/// Actions and systems are kept in `BTreeSet`s so iteration order (and
/// therefore serialization) is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Intent {
    pub actions: BTreeSet<String>,
    pub systems: BTreeSet<String>,
    pub data_sensitivity: DataSensitivity,
    pub cross_border: bool,
}

impl Intent {
    /// The maximally conservative default intent: read-only knowledge-base
    /// retrieval of internal data, no cross-border movement.
    pub fn conservative() -> Self {
        Self {
            actions: BTreeSet::from(["retrieve".to_string()]),
            systems: BTreeSet::from(["kb".to_string()]),
            data_sensitivity: DataSensitivity::Internal,
            cross_border: false,
        }
    }

    /// Build a normalized intent from raw caller-supplied fields.
    ///
    /// Entries are lowercased and trimmed; blank entries are dropped; an
    /// empty action or system set falls back to the conservative default
    /// for that dimension.
    pub fn normalized(
        actions: impl IntoIterator<Item = String>,
        systems: impl IntoIterator<Item = String>,
        data_sensitivity: DataSensitivity,
        cross_border: bool,
    ) -> Self {
        let mut actions: BTreeSet<String> = actions
            .into_iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();
        let mut systems: BTreeSet<String> = systems
            .into_iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if actions.is_empty() {
            actions.insert("retrieve".to_string());
        }
        if systems.is_empty() {
            systems.insert("kb".to_string());
        }

        Self {
            actions,
            systems,
            data_sensitivity,
            cross_border,
        }
    }
}

/// A partially specified intent, as produced by an advisory signal
/// extractor. Missing dimensions fall back to conservative defaults when
/// converted into a full [`Intent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialIntent {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub systems: Vec<String>,
    #[serde(default)]
    pub data_sensitivity: Option<DataSensitivity>,
    #[serde(default)]
    pub cross_border: Option<bool>,
}

impl PartialIntent {
    /// Fill in the gaps and normalize into a complete intent.
    pub fn into_intent(self) -> Intent {
        Intent::normalized(
            self.actions,
            self.systems,
            self.data_sensitivity.unwrap_or_default(),
            self.cross_border.unwrap_or(false),
        )
    }
}

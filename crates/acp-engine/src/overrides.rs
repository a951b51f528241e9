// overrides.rs — Time-bounded manual tier overrides.
//
// An override substitutes an alternate tier for an agent, but only while
// it is approved and unexpired. Expiry is evaluated at read time — there
// is no background sweeper. TTLs are clamped to [1, 1440] minutes: a
// zero/negative TTL would expire immediately and an unbounded one would
// be a permanent silent override.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use acp_ledger::{hash_identity, Ledger};
use acp_policy::Tier;

use crate::error::GovernanceError;
use crate::event::EventKind;
use crate::projection::Projections;

/// Lifecycle state of an override request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverrideStatus {
    Pending,
    Approved,
    Rejected,
    Revoked,
}

impl std::fmt::Display for OverrideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideStatus::Pending => write!(f, "PENDING"),
            OverrideStatus::Approved => write!(f, "APPROVED"),
            OverrideStatus::Rejected => write!(f, "REJECTED"),
            OverrideStatus::Revoked => write!(f, "REVOKED"),
        }
    }
}

/// One override request and its approval state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverrideRecord {
    pub override_id: Uuid,
    pub agent_id: Uuid,
    pub requested_tier: Tier,
    pub requested_by_hash: String,
    pub reason: String,
    pub status: OverrideStatus,
    #[serde(default)]
    pub approved_by_hash: Option<String>,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl OverrideRecord {
    /// Active means approved and not yet expired at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OverrideStatus::Approved
            && self.expires_at.is_some_and(|expiry| now < expiry)
    }
}

/// Manages the override workflow on top of the shared ledger.
pub struct OverrideManager {
    projections: Projections,
    ledger: Arc<Ledger>,
}

impl OverrideManager {
    pub fn new(projections: Projections, ledger: Arc<Ledger>) -> Self {
        Self {
            projections,
            ledger,
        }
    }

    /// File a new override request (status PENDING).
    pub fn request(
        &self,
        agent_id: Uuid,
        requested_tier: Tier,
        requested_by: &str,
        reason: &str,
    ) -> Result<OverrideRecord, GovernanceError> {
        let record = OverrideRecord {
            override_id: Uuid::new_v4(),
            agent_id,
            requested_tier,
            requested_by_hash: hash_identity(requested_by),
            reason: reason.to_string(),
            status: OverrideStatus::Pending,
            approved_by_hash: None,
            requested_at: Utc::now(),
            approved_at: None,
            expires_at: None,
        };

        self.ledger.append(
            EventKind::OverrideRequested.as_str(),
            json!({ "override": &record }),
        )?;
        self.projections.put_override(&record)?;
        Ok(record)
    }

    /// Approve a pending override with a TTL in minutes, clamped to
    /// [1, 1440].
    pub fn approve(
        &self,
        override_id: Uuid,
        approved_by: &str,
        ttl_minutes: i64,
    ) -> Result<OverrideRecord, GovernanceError> {
        let mut record = self.load(override_id)?;
        if record.status != OverrideStatus::Pending {
            return Err(GovernanceError::StateConflict {
                kind: "override",
                id: override_id.to_string(),
                detail: format!("cannot approve an override in state {}", record.status),
            });
        }

        let ttl = ttl_minutes.clamp(1, 24 * 60);
        let now = Utc::now();
        record.status = OverrideStatus::Approved;
        record.approved_by_hash = Some(hash_identity(approved_by));
        record.approved_at = Some(now);
        record.expires_at = Some(now + Duration::minutes(ttl));

        self.ledger.append(
            EventKind::OverrideApproved.as_str(),
            json!({ "override": &record }),
        )?;
        self.projections.put_override(&record)?;
        tracing::info!(
            "override {} approved for agent {} (tier {}, ttl {}m)",
            record.override_id,
            record.agent_id,
            record.requested_tier,
            ttl
        );
        Ok(record)
    }

    /// Reject a pending override request.
    pub fn reject(
        &self,
        override_id: Uuid,
        rejected_by: &str,
    ) -> Result<OverrideRecord, GovernanceError> {
        let mut record = self.load(override_id)?;
        if record.status != OverrideStatus::Pending {
            return Err(GovernanceError::StateConflict {
                kind: "override",
                id: override_id.to_string(),
                detail: format!("cannot reject an override in state {}", record.status),
            });
        }

        record.status = OverrideStatus::Rejected;
        record.approved_by_hash = Some(hash_identity(rejected_by));

        self.ledger.append(
            EventKind::OverrideRejected.as_str(),
            json!({ "override": &record }),
        )?;
        self.projections.put_override(&record)?;
        Ok(record)
    }

    /// Revoke an override. Valid from any non-revoked state and idempotent
    /// toward "already revoked".
    pub fn revoke(
        &self,
        override_id: Uuid,
        revoked_by: &str,
    ) -> Result<OverrideRecord, GovernanceError> {
        let mut record = self.load(override_id)?;
        if record.status == OverrideStatus::Revoked {
            return Ok(record);
        }

        let now = Utc::now();
        record.status = OverrideStatus::Revoked;
        if record.approved_by_hash.is_none() {
            record.approved_by_hash = Some(hash_identity(revoked_by));
        }
        record.expires_at = Some(now);

        self.ledger.append(
            EventKind::OverrideRevoked.as_str(),
            json!({ "override": &record }),
        )?;
        self.projections.put_override(&record)?;
        Ok(record)
    }

    /// The active override for an agent: the approved, unexpired record
    /// with the latest expiry, or None.
    pub fn active_override_for(
        &self,
        agent_id: Uuid,
    ) -> Result<Option<OverrideRecord>, GovernanceError> {
        let now = Utc::now();
        let mut candidates: Vec<OverrideRecord> = self
            .projections
            .list_overrides()?
            .into_iter()
            .filter(|r| r.agent_id == agent_id && r.is_active_at(now))
            .collect();
        candidates.sort_by_key(|r| r.expires_at);
        Ok(candidates.pop())
    }

    /// All override records, newest request first.
    pub fn list(&self) -> Result<Vec<OverrideRecord>, GovernanceError> {
        self.projections.list_overrides()
    }

    fn load(&self, override_id: Uuid) -> Result<OverrideRecord, GovernanceError> {
        self.projections
            .get_override(override_id)?
            .ok_or(GovernanceError::NotFound {
                kind: "override",
                id: override_id.to_string(),
            })
    }
}

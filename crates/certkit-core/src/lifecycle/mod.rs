//! Certification record lifecycle.
//!
//! A [`CertificationRecord`] is issued from a recorded assessment
//! ([`CertHistoryEntry`]) and then moves through explicit, operator-driven
//! transitions:
//!
//! ```text
//! issue ──► Active ──suspend──► Suspended ──reinstate──► Active
//!             │  ▲                  │
//!   check_    │  └──renew (within   │
//!  expirations▼     grace period)   │
//!           Expired                 │
//!             └───────revoke────────┴──► Revoked (terminal)
//! ```
//!
//! Nothing happens on a timer: expiry only takes effect when the operator
//! calls [`LifecycleManager::check_expirations`]. Renewal keeps the
//! certified level; a higher level needs a new issuance from a new run.
//! Every transition takes `now` explicitly and appends a [`LifecycleEvent`].

mod error;
mod store;

pub use error::{LifecycleError, LifecycleResult};
pub use store::{CertRecordStore, DEFAULT_RECORDS_FILE};

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::history::CertHistoryEntry;
use crate::levels::CertificationLevel;
use crate::obs::emit_lifecycle_transition;

/// State of a certification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Active,
    Expired,
    Suspended,
    Revoked,
}

impl RecordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Active => "active",
            RecordState::Expired => "expired",
            RecordState::Suspended => "suspended",
            RecordState::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validity and renewal limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalPolicy {
    /// Days an issued or renewed record stays valid.
    pub validity_period_days: u32,
    /// Days after expiry during which an expired record may still be renewed.
    pub grace_period_days: u32,
    pub max_renewals: u32,
    /// Renewal must present a fresh assessment run.
    pub require_reassessment: bool,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            validity_period_days: 730,
            grace_period_days: 30,
            max_renewals: 10,
            require_reassessment: true,
        }
    }
}

/// A certification issued to one implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationRecord {
    pub record_id: String,
    pub implementation_name: String,
    pub level: CertificationLevel,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: RecordState,
    pub renewal_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
    /// Run the current validity period rests on.
    pub run_id: String,
    /// SHA-256 over that run's identity and outcome.
    pub assessment_digest: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    Issued,
    Renewed,
    Expired,
    Suspended,
    Reinstated,
    Revoked,
}

impl LifecycleEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEventKind::Issued => "issued",
            LifecycleEventKind::Renewed => "renewed",
            LifecycleEventKind::Expired => "expired",
            LifecycleEventKind::Suspended => "suspended",
            LifecycleEventKind::Reinstated => "reinstated",
            LifecycleEventKind::Revoked => "revoked",
        }
    }
}

/// One transition in a record's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub event_id: String,
    pub record_id: String,
    pub kind: LifecycleEventKind,
    pub occurred_at: DateTime<Utc>,
    pub details: String,
}

/// Digest binding a record to the assessment it was issued or renewed on.
pub fn assessment_digest(entry: &CertHistoryEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry.run.run_id.as_bytes());
    hasher.update([0]);
    hasher.update(entry.run.implementation_name.as_bytes());
    hasher.update([0]);
    hasher.update(entry.run.registry_digest.as_bytes());
    hasher.update([0]);
    hasher.update(entry.certification.achieved_level.as_str().as_bytes());
    hasher.update(entry.certification.overall_score.to_bits().to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Certification records and their event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleManager {
    policy: RenewalPolicy,
    records: BTreeMap<String, CertificationRecord>,
    events: Vec<LifecycleEvent>,
}

impl LifecycleManager {
    pub fn new(policy: RenewalPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &RenewalPolicy {
        &self.policy
    }

    /// Issue an `Active` record at the level the assessment achieved.
    pub fn issue(
        &mut self,
        assessment: &CertHistoryEntry,
        now: DateTime<Utc>,
    ) -> LifecycleResult<CertificationRecord> {
        let level = assessment.certification.achieved_level;
        if level == CertificationLevel::Unrated {
            return Err(LifecycleError::NotCertified {
                run_id: assessment.run.run_id.clone(),
            });
        }

        let record = CertificationRecord {
            record_id: uuid::Uuid::new_v4().to_string(),
            implementation_name: assessment.run.implementation_name.clone(),
            level,
            issued_at: now,
            expires_at: self.expiry_from(now),
            state: RecordState::Active,
            renewal_count: 0,
            revocation_reason: None,
            run_id: assessment.run.run_id.clone(),
            assessment_digest: assessment_digest(assessment),
        };
        self.records
            .insert(record.record_id.clone(), record.clone());
        self.log(
            &record,
            LifecycleEventKind::Issued,
            format!(
                "issued at {} from run {}; expires {}",
                level,
                record.run_id,
                record.expires_at.date_naive()
            ),
            now,
        );
        Ok(record)
    }

    /// Extend an `Active` record, or an `Expired` one still inside the grace
    /// period. The level never changes.
    pub fn renew(
        &mut self,
        record_id: &str,
        reassessment: Option<&CertHistoryEntry>,
        now: DateTime<Utc>,
    ) -> LifecycleResult<CertificationRecord> {
        let policy = self.policy.clone();
        let expires_at = self.expiry_from(now);
        let record = self.record_mut(record_id)?;

        match record.state {
            RecordState::Revoked => {
                return Err(LifecycleError::Revoked {
                    record_id: record_id.to_string(),
                })
            }
            RecordState::Suspended => {
                return Err(LifecycleError::Suspended {
                    record_id: record_id.to_string(),
                })
            }
            RecordState::Active | RecordState::Expired => {}
        }
        if record.renewal_count >= policy.max_renewals {
            return Err(LifecycleError::RenewalLimit {
                record_id: record_id.to_string(),
                max_renewals: policy.max_renewals,
            });
        }
        let grace_deadline =
            record.expires_at + Duration::days(i64::from(policy.grace_period_days));
        if record.state == RecordState::Expired && now > grace_deadline {
            return Err(LifecycleError::GracePeriodElapsed {
                record_id: record_id.to_string(),
                expired_on: record.expires_at.date_naive(),
                grace_period_days: policy.grace_period_days,
            });
        }

        match reassessment {
            Some(entry) => {
                if entry.run.implementation_name != record.implementation_name {
                    return Err(LifecycleError::ImplementationMismatch {
                        run_id: entry.run.run_id.clone(),
                        expected: record.implementation_name.clone(),
                        found: entry.run.implementation_name.clone(),
                    });
                }
                if entry.certification.achieved_level < record.level {
                    return Err(LifecycleError::LevelNotMaintained {
                        run_id: entry.run.run_id.clone(),
                        achieved: entry.certification.achieved_level,
                        certified: record.level,
                    });
                }
                record.run_id = entry.run.run_id.clone();
                record.assessment_digest = assessment_digest(entry);
            }
            None if policy.require_reassessment => {
                return Err(LifecycleError::ReassessmentRequired {
                    record_id: record_id.to_string(),
                })
            }
            None => {}
        }

        record.expires_at = expires_at;
        record.state = RecordState::Active;
        record.renewal_count += 1;
        let snapshot = record.clone();
        self.log(
            &snapshot,
            LifecycleEventKind::Renewed,
            format!(
                "renewal #{} on run {}; expires {}",
                snapshot.renewal_count,
                snapshot.run_id,
                snapshot.expires_at.date_naive()
            ),
            now,
        );
        Ok(snapshot)
    }

    /// Reversible hold on a record that is not revoked.
    pub fn suspend(
        &mut self,
        record_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> LifecycleResult<CertificationRecord> {
        let record = self.record_mut(record_id)?;
        match record.state {
            RecordState::Revoked => {
                return Err(LifecycleError::Revoked {
                    record_id: record_id.to_string(),
                })
            }
            RecordState::Suspended => {
                return Err(LifecycleError::AlreadyInState {
                    record_id: record_id.to_string(),
                    state: RecordState::Suspended,
                })
            }
            RecordState::Active | RecordState::Expired => {}
        }
        record.state = RecordState::Suspended;
        let snapshot = record.clone();
        self.log(
            &snapshot,
            LifecycleEventKind::Suspended,
            format!("suspended: {reason}"),
            now,
        );
        Ok(snapshot)
    }

    pub fn reinstate(
        &mut self,
        record_id: &str,
        now: DateTime<Utc>,
    ) -> LifecycleResult<CertificationRecord> {
        let record = self.record_mut(record_id)?;
        if record.state != RecordState::Suspended {
            return Err(LifecycleError::NotSuspended {
                record_id: record_id.to_string(),
                state: record.state,
            });
        }
        record.state = RecordState::Active;
        let snapshot = record.clone();
        self.log(
            &snapshot,
            LifecycleEventKind::Reinstated,
            "reinstated from suspended".to_string(),
            now,
        );
        Ok(snapshot)
    }

    /// Terminal. A revoked record is never renewed or reinstated.
    pub fn revoke(
        &mut self,
        record_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> LifecycleResult<CertificationRecord> {
        let record = self.record_mut(record_id)?;
        if record.state == RecordState::Revoked {
            return Err(LifecycleError::AlreadyInState {
                record_id: record_id.to_string(),
                state: RecordState::Revoked,
            });
        }
        record.state = RecordState::Revoked;
        record.revocation_reason = Some(reason.to_string());
        let snapshot = record.clone();
        self.log(
            &snapshot,
            LifecycleEventKind::Revoked,
            format!("revoked: {reason}"),
            now,
        );
        Ok(snapshot)
    }

    /// Move every `Active` record whose expiry lies before `now` to
    /// `Expired`. Returns the records that changed.
    pub fn check_expirations(&mut self, now: DateTime<Utc>) -> Vec<CertificationRecord> {
        let expired: Vec<CertificationRecord> = self
            .records
            .values_mut()
            .filter(|r| r.state == RecordState::Active && r.expires_at < now)
            .map(|r| {
                r.state = RecordState::Expired;
                r.clone()
            })
            .collect();

        for record in &expired {
            self.log(
                record,
                LifecycleEventKind::Expired,
                format!("expired; validity ended {}", record.expires_at.date_naive()),
                now,
            );
        }
        expired
    }

    pub fn record(&self, record_id: &str) -> Option<&CertificationRecord> {
        self.records.get(record_id)
    }

    /// All records, newest issuance first.
    pub fn records(&self) -> Vec<&CertificationRecord> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        records
    }

    pub fn records_for(&self, implementation_name: &str) -> Vec<&CertificationRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.implementation_name == implementation_name)
            .collect()
    }

    /// Events for one record, in the order they happened.
    pub fn events(&self, record_id: &str) -> Vec<&LifecycleEvent> {
        self.events
            .iter()
            .filter(|e| e.record_id == record_id)
            .collect()
    }

    pub fn export_events_json(&self, record_id: &str) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(&self.events(record_id))?)
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(i64::from(self.policy.validity_period_days))
    }

    fn record_mut(&mut self, record_id: &str) -> LifecycleResult<&mut CertificationRecord> {
        self.records
            .get_mut(record_id)
            .ok_or_else(|| LifecycleError::RecordNotFound(record_id.to_string()))
    }

    fn log(
        &mut self,
        record: &CertificationRecord,
        kind: LifecycleEventKind,
        details: String,
        now: DateTime<Utc>,
    ) {
        emit_lifecycle_transition(
            &record.record_id,
            &record.implementation_name,
            kind.as_str(),
            record.state.as_str(),
        );
        self.events.push(LifecycleEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            record_id: record.record_id.clone(),
            kind,
            occurred_at: now,
            details,
        });
    }
}

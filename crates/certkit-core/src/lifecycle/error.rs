//! Error types for certification record lifecycle operations.

use chrono::NaiveDate;

use super::RecordState;
use crate::levels::CertificationLevel;

/// Rejected lifecycle transitions.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("certification record not found: {0}")]
    RecordNotFound(String),

    #[error("run {run_id} achieved no certification level; nothing to issue")]
    NotCertified { run_id: String },

    #[error("record {record_id} is revoked; a new assessment and issuance is required")]
    Revoked { record_id: String },

    #[error("record {record_id} is suspended; reinstate it before renewing")]
    Suspended { record_id: String },

    #[error("record {record_id} is already {state}")]
    AlreadyInState {
        record_id: String,
        state: RecordState,
    },

    #[error("record {record_id} is {state}; only suspended records can be reinstated")]
    NotSuspended {
        record_id: String,
        state: RecordState,
    },

    #[error("record {record_id} reached the renewal limit ({max_renewals}); issue a new certification")]
    RenewalLimit { record_id: String, max_renewals: u32 },

    #[error(
        "record {record_id} expired on {expired_on} and the {grace_period_days}-day grace period has passed"
    )]
    GracePeriodElapsed {
        record_id: String,
        expired_on: NaiveDate,
        grace_period_days: u32,
    },

    #[error("renewing record {record_id} requires a fresh assessment run")]
    ReassessmentRequired { record_id: String },

    #[error("assessment run {run_id} is for '{found}', but the record certifies '{expected}'")]
    ImplementationMismatch {
        run_id: String,
        expected: String,
        found: String,
    },

    #[error("assessment run {run_id} achieved {achieved}, below the certified {certified}")]
    LevelNotMaintained {
        run_id: String,
        achieved: CertificationLevel,
        certified: CertificationLevel,
    },
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

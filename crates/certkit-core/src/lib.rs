//! certkit core library
//!
//! Conformance execution and certification scoring: the check registry, the
//! runner that drives checks against an [`ImplementationAdapter`], and the
//! scorer that maps a [`RunResult`] onto a [`CertificationLevel`]. Scored
//! runs can be kept in a local [`CertHistory`] and turned into
//! [`CertificationRecord`]s with an operator-driven lifecycle.

pub mod adapter;
pub mod check;
pub mod config;
pub mod error;
pub mod fakes;
pub mod history;
pub mod levels;
pub mod lifecycle;
pub mod obs;
pub mod protocol;
pub mod registry;
pub mod result;
pub mod runner;
pub mod scorer;
pub mod telemetry;

pub use adapter::{AdapterError, ImplementationAdapter};
pub use check::{Assertion, CheckDefinition, CrossProtocolCheck};
pub use config::RunnerConfig;
pub use error::{CertifyError, Result};
pub use fakes::{ReferenceAdapter, ScriptFixture, Script, ScriptedAdapter, ScriptedOutcome, ScriptedStep};
pub use history::{CertHistory, CertHistoryEntry};
pub use levels::{protocols_for_level, CertificationLevel, LevelDefinition, LEVEL_DEFINITIONS};
pub use lifecycle::{
    CertRecordStore, CertificationRecord, LifecycleError, LifecycleEvent, LifecycleEventKind,
    LifecycleManager, RecordState, RenewalPolicy,
};
pub use protocol::{ProtocolId, Requirement, CROSS_PROTOCOL};
pub use registry::{CheckRegistry, REQUIREMENTS_VERSION};
pub use result::{CheckResult, CheckStatus, ProtocolResult, RunResult};
pub use runner::{ConformanceRunner, RunTarget};
pub use scorer::{pooled_score, CertificationResult, CertificationScorer, LevelAssessment};

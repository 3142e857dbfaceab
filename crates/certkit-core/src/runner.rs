//! Conformance runner.
//!
//! Walks the registry for the requested protocols in canonical order, invokes
//! the adapter once per check, strictly sequentially, and converts every
//! outcome into one of four terminal statuses:
//!
//! - response satisfying the assertion → `pass`, otherwise `fail`
//! - "not supported" → `skip` for SHOULD, `fail` for MUST
//! - any other adapter failure, malformed response or timeout → `error`
//!
//! Only [`CertifyError::UnknownProtocol`] escapes, and it does so before any
//! check runs. Cross-protocol checks execute last, against the in-memory
//! table of single-protocol results.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::time::Instant;
use uuid::Uuid;

use crate::adapter::{AdapterError, ImplementationAdapter};
use crate::check::{CheckDefinition, CrossProtocolCheck};
use crate::config::RunnerConfig;
use crate::error::Result;
use crate::levels::{protocols_for_level, CertificationLevel};
use crate::obs::{
    emit_check_completed, emit_protocol_completed, emit_run_finished, emit_run_started,
    emit_run_truncated, RunSpan,
};
use crate::protocol::{ProtocolId, Requirement, CROSS_PROTOCOL};
use crate::registry::CheckRegistry;
use crate::result::{CheckResult, CheckStatus, ProtocolResult, RunResult};

/// Message recorded for checks that never started because the run timed out.
pub const RUN_TRUNCATED_MESSAGE: &str = "run truncated: run timeout expired before check started";

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    /// Every recognised protocol.
    All,
    /// An explicit list of protocol ids, in any order, duplicates ignored.
    Protocols(Vec<String>),
    /// The protocols required by a level and every level below it.
    Level(CertificationLevel),
}

impl RunTarget {
    pub fn protocols<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RunTarget::Protocols(ids.into_iter().map(Into::into).collect())
    }

    pub fn level(&self) -> Option<CertificationLevel> {
        match self {
            RunTarget::Level(level) => Some(*level),
            _ => None,
        }
    }
}

/// Terminal outcome of one adapter invocation.
#[derive(Debug, Clone, PartialEq)]
enum Invocation {
    Responded(Value),
    Raised(AdapterError),
    TimedOut { after_ms: u128 },
}

/// Tracks the optional run-level deadline.
struct RunClock {
    started: Instant,
    deadline: Option<Instant>,
    truncated: bool,
}

impl RunClock {
    fn new(run_timeout_ms: Option<u64>) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: run_timeout_ms.map(|ms| started + Duration::from_millis(ms)),
            truncated: false,
        }
    }

    /// Time left before the deadline. `Err(())` once it has passed.
    fn remaining(&mut self) -> std::result::Result<Option<Duration>, ()> {
        match self.deadline {
            None => Ok(None),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    self.truncated = true;
                    Err(())
                } else {
                    Ok(Some(deadline - now))
                }
            }
        }
    }
}

/// Executes the check catalogue against an [`ImplementationAdapter`].
///
/// # Example
///
/// ```ignore
/// let runner = ConformanceRunner::new(RunnerConfig::new("my-impl"));
/// let run = runner.run(RunTarget::Level(CertificationLevel::Silver), &adapter).await?;
/// ```
pub struct ConformanceRunner {
    registry: CheckRegistry,
    config: RunnerConfig,
}

impl ConformanceRunner {
    /// Runner over the published catalogue.
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_registry(CheckRegistry::standard(), config)
    }

    pub fn with_registry(registry: CheckRegistry, config: RunnerConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Resolve a target to protocol ids in canonical order.
    pub fn resolve_protocols(target: &RunTarget) -> Result<Vec<ProtocolId>> {
        let set: BTreeSet<ProtocolId> = match target {
            RunTarget::All => ProtocolId::ALL.into_iter().collect(),
            RunTarget::Protocols(ids) => ids
                .iter()
                .map(|id| ProtocolId::parse(id))
                .collect::<Result<_>>()?,
            RunTarget::Level(level) => protocols_for_level(*level),
        };
        Ok(set.into_iter().collect())
    }

    /// Run the conformance checks for `target`.
    ///
    /// Always returns a scoreable [`RunResult`] unless a requested protocol
    /// id is not recognised.
    pub async fn run<A>(&self, target: RunTarget, adapter: &A) -> Result<RunResult>
    where
        A: ImplementationAdapter + ?Sized,
    {
        let protocols = Self::resolve_protocols(&target)?;

        let run_id = Uuid::new_v4().to_string();
        let _span = RunSpan::enter(&run_id);
        emit_run_started(&run_id, &self.config.implementation_name, &protocols);

        let run_timestamp = Utc::now();
        let mut clock = RunClock::new(self.config.run_timeout_ms);

        let mut protocol_results = Vec::with_capacity(protocols.len());
        for protocol in &protocols {
            let mut checks = Vec::new();
            for definition in self.registry.checks(*protocol) {
                let result = self.execute_check(adapter, definition, &mut clock).await;
                emit_check_completed(&result);
                checks.push(result);
            }
            let protocol_result = ProtocolResult::from_checks(*protocol, checks);
            emit_protocol_completed(&protocol_result);
            protocol_results.push(protocol_result);
        }

        let mut cross_protocol_checks = Vec::new();
        {
            let table: BTreeMap<ProtocolId, &ProtocolResult> =
                protocol_results.iter().map(|p| (p.protocol, p)).collect();

            for cross in self.registry.cross_protocol_checks() {
                let result = if clock.remaining().is_err() {
                    CheckResult::from_definition(
                        &cross.definition,
                        CheckStatus::Error,
                        Some(RUN_TRUNCATED_MESSAGE.to_string()),
                    )
                } else if let Some(skipped) = gate_cross_check(cross, &table) {
                    skipped
                } else {
                    self.execute_check(adapter, &cross.definition, &mut clock)
                        .await
                };
                let result = CheckResult {
                    protocol: CROSS_PROTOCOL.to_string(),
                    ..result
                };
                emit_check_completed(&result);
                cross_protocol_checks.push(result);
            }
        }

        if clock.truncated {
            emit_run_truncated(&run_id, self.config.run_timeout_ms.unwrap_or_default());
        }

        let run = RunResult {
            run_id,
            implementation_name: self.config.implementation_name.clone(),
            run_timestamp,
            completed_at: Utc::now(),
            registry_digest: self.registry.digest(),
            target_level: target.level(),
            truncated: clock.truncated,
            protocols: protocol_results,
            cross_protocol_checks,
        };

        emit_run_finished(
            &run.run_id,
            clock.started.elapsed().as_millis() as u64,
            run.total_checks(),
            run.truncated,
        );
        Ok(run)
    }

    /// Invoke the adapter for one check and classify the outcome.
    async fn execute_check<A>(
        &self,
        adapter: &A,
        definition: &CheckDefinition,
        clock: &mut RunClock,
    ) -> CheckResult
    where
        A: ImplementationAdapter + ?Sized,
    {
        let remaining = match clock.remaining() {
            Ok(remaining) => remaining,
            Err(()) => {
                return CheckResult::from_definition(
                    definition,
                    CheckStatus::Error,
                    Some(RUN_TRUNCATED_MESSAGE.to_string()),
                )
            }
        };

        let per_check = self.config.per_check_timeout_ms.map(Duration::from_millis);
        let limit = match (per_check, remaining) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let call = adapter.invoke(definition.protocol, definition.operation, &definition.payload);
        let outcome = match limit {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(Ok(response)) => Invocation::Responded(response),
                Ok(Err(err)) => Invocation::Raised(err),
                Err(_) => Invocation::TimedOut {
                    after_ms: limit.as_millis(),
                },
            },
            None => match call.await {
                Ok(response) => Invocation::Responded(response),
                Err(err) => Invocation::Raised(err),
            },
        };

        classify(definition, outcome)
    }
}

/// Map an invocation outcome onto a terminal check status.
fn classify(definition: &CheckDefinition, outcome: Invocation) -> CheckResult {
    let (status, message) = match outcome {
        Invocation::Responded(response) if !response.is_object() => (
            CheckStatus::Error,
            Some(format!(
                "malformed response: expected a JSON object, got: {response}"
            )),
        ),
        Invocation::Responded(response) => match definition.evaluate(&response) {
            Ok(()) => (CheckStatus::Pass, None),
            Err(reason) => (CheckStatus::Fail, Some(reason)),
        },
        Invocation::Raised(AdapterError::NotSupported { operation }) => {
            match definition.requirement {
                Requirement::Should => (
                    CheckStatus::Skip,
                    Some(format!(
                        "operation '{operation}' not supported (SHOULD, not MUST)"
                    )),
                ),
                Requirement::Must => (
                    CheckStatus::Fail,
                    Some(format!(
                        "operation '{operation}' not supported but required (MUST)"
                    )),
                ),
            }
        }
        Invocation::Raised(AdapterError::Failed(message)) => (
            CheckStatus::Error,
            Some(format!("adapter error: {message}")),
        ),
        Invocation::TimedOut { after_ms } => (
            CheckStatus::Error,
            Some(format!("timeout: no response within {after_ms}ms")),
        ),
    };
    CheckResult::from_definition(definition, status, message)
}

/// `Some(skip)` when a cross check cannot run against the result table.
fn gate_cross_check(
    check: &CrossProtocolCheck,
    table: &BTreeMap<ProtocolId, &ProtocolResult>,
) -> Option<CheckResult> {
    let missing: Vec<&str> = check
        .depends_on
        .iter()
        .filter(|p| !table.contains_key(*p))
        .map(ProtocolId::as_str)
        .collect();
    if !missing.is_empty() {
        return Some(CheckResult::from_definition(
            &check.definition,
            CheckStatus::Skip,
            Some(format!(
                "dependency protocol(s) not executed: {}",
                missing.join(", ")
            )),
        ));
    }

    for (protocol, check_id) in &check.prerequisites {
        let passed = table
            .get(protocol)
            .and_then(|r| r.check(check_id))
            .is_some_and(CheckResult::passed);
        if !passed {
            return Some(CheckResult::from_definition(
                &check.definition,
                CheckStatus::Skip,
                Some(format!("prerequisite check {check_id} did not pass")),
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::expect_true;
    use serde_json::json;

    fn ok_field(r: &Value) -> std::result::Result<(), String> {
        expect_true(r, "ok")
    }

    fn must() -> CheckDefinition {
        CheckDefinition::must("T-MUST-001", "atp", "op", "d", json!({}), ok_field)
    }

    fn should() -> CheckDefinition {
        CheckDefinition::should("T-SHOULD-001", "atp", "op", "d", json!({}), ok_field)
    }

    #[test]
    fn test_classify_response() {
        let pass = classify(&must(), Invocation::Responded(json!({ "ok": true })));
        assert_eq!(pass.status, CheckStatus::Pass);
        assert!(pass.message.is_none());

        let fail = classify(&must(), Invocation::Responded(json!({ "ok": false })));
        assert_eq!(fail.status, CheckStatus::Fail);
        assert!(fail.message.is_some());
    }

    #[test]
    fn test_classify_malformed_response_is_error() {
        let result = classify(&must(), Invocation::Responded(json!([1, 2, 3])));
        assert_eq!(result.status, CheckStatus::Error);
        assert!(result.message.unwrap().contains("malformed"));
    }

    #[test]
    fn test_classify_not_supported_by_requirement() {
        let raised = || Invocation::Raised(AdapterError::not_supported("op"));
        assert_eq!(classify(&should(), raised()).status, CheckStatus::Skip);
        assert_eq!(classify(&must(), raised()).status, CheckStatus::Fail);
    }

    #[test]
    fn test_classify_failures_are_errors() {
        let failed = classify(&should(), Invocation::Raised(AdapterError::failed("boom")));
        assert_eq!(failed.status, CheckStatus::Error);
        assert!(failed.message.unwrap().contains("boom"));

        let timed_out = classify(&must(), Invocation::TimedOut { after_ms: 50 });
        assert_eq!(timed_out.status, CheckStatus::Error);
        assert!(timed_out.message.unwrap().contains("timeout"));
    }

    #[test]
    fn test_resolve_protocols_canonical_and_deduped() {
        let target = RunTarget::protocols(["alcp", "ATP", "aip", "atp"]);
        let resolved = ConformanceRunner::resolve_protocols(&target).unwrap();
        assert_eq!(
            resolved,
            vec![ProtocolId::Atp, ProtocolId::Aip, ProtocolId::Alcp]
        );
    }

    #[test]
    fn test_resolve_level_includes_lower_levels() {
        let resolved =
            ConformanceRunner::resolve_protocols(&RunTarget::Level(CertificationLevel::Gold))
                .unwrap();
        assert_eq!(
            resolved,
            vec![
                ProtocolId::Atp,
                ProtocolId::Aip,
                ProtocolId::Aeap,
                ProtocolId::Amgp,
                ProtocolId::Aoap,
            ]
        );
        assert_eq!(
            ConformanceRunner::resolve_protocols(&RunTarget::All)
                .unwrap()
                .len(),
            7
        );
    }

    #[test]
    fn test_resolve_unknown_protocol_fails() {
        let err = ConformanceRunner::resolve_protocols(&RunTarget::protocols(["atp", "nope"]))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::CertifyError::UnknownProtocol { .. }
        ));
    }

    #[test]
    fn test_gate_skips_missing_dependency() {
        let cross = CrossProtocolCheck::new(must(), &[ProtocolId::Atp, ProtocolId::Aeap]);
        let atp = ProtocolResult::from_checks(ProtocolId::Atp, vec![]);
        let table: BTreeMap<_, _> = [(ProtocolId::Atp, &atp)].into_iter().collect();
        let skipped = gate_cross_check(&cross, &table).unwrap();
        assert_eq!(skipped.status, CheckStatus::Skip);
        assert!(skipped.message.unwrap().contains("aeap"));
    }

    #[test]
    fn test_gate_checks_prerequisites() {
        let cross = CrossProtocolCheck::new(must(), &[ProtocolId::Atp])
            .with_prerequisite(ProtocolId::Atp, "T-MUST-001");
        let failing = ProtocolResult::from_checks(
            ProtocolId::Atp,
            vec![CheckResult::from_definition(&must(), CheckStatus::Fail, None)],
        );
        let table: BTreeMap<_, _> = [(ProtocolId::Atp, &failing)].into_iter().collect();
        assert!(gate_cross_check(&cross, &table).is_some());

        let passing = ProtocolResult::from_checks(
            ProtocolId::Atp,
            vec![CheckResult::from_definition(&must(), CheckStatus::Pass, None)],
        );
        let table: BTreeMap<_, _> = [(ProtocolId::Atp, &passing)].into_iter().collect();
        assert!(gate_cross_check(&cross, &table).is_none());
    }
}

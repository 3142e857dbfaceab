//! Check, protocol and run results.
//!
//! Results are created fresh per run and are read-only once the runner hands
//! them over. Counts and pass rates are derived from the check list at
//! construction time by [`ProtocolResult::from_checks`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::check::CheckDefinition;
use crate::levels::CertificationLevel;
use crate::protocol::{ProtocolId, Requirement};

/// Terminal status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Skip => "skip",
            CheckStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one executed check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: String,
    /// Protocol namespace (`"atp"`, ..., or `"cross_protocol"`).
    pub protocol: String,
    pub description: String,
    pub requirement: Requirement,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    pub fn from_definition(
        definition: &CheckDefinition,
        status: CheckStatus,
        message: Option<String>,
    ) -> Self {
        Self {
            id: definition.id.to_string(),
            protocol: definition.protocol.to_string(),
            description: definition.description.to_string(),
            requirement: definition.requirement,
            status,
            message,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Pass
    }

    /// A MUST-level check that passed. Required protocols need at least one.
    pub fn is_passing_must(&self) -> bool {
        self.requirement == Requirement::Must && self.passed()
    }
}

/// Aggregated results for one protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolResult {
    #[serde(rename = "protocol_id")]
    pub protocol: ProtocolId,
    pub checks: Vec<CheckResult>,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errored: usize,
    /// passed / (passed + failed); 0.0 when nothing passed or failed.
    pub pass_rate: f64,
}

impl ProtocolResult {
    /// Build a protocol result, deriving counts and pass rate from `checks`.
    pub fn from_checks(protocol: ProtocolId, checks: Vec<CheckResult>) -> Self {
        let count = |status: CheckStatus| checks.iter().filter(|c| c.status == status).count();
        let passed = count(CheckStatus::Pass);
        let failed = count(CheckStatus::Fail);
        let skipped = count(CheckStatus::Skip);
        let errored = count(CheckStatus::Error);

        Self {
            protocol,
            pass_rate: pass_rate(passed, failed),
            checks,
            passed,
            failed,
            skipped,
            errored,
        }
    }

    /// Checks that entered the pass-rate denominator.
    pub fn scored(&self) -> usize {
        self.passed + self.failed
    }

    pub fn has_passing_must(&self) -> bool {
        self.checks.iter().any(CheckResult::is_passing_must)
    }

    pub fn check(&self, id: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.id == id)
    }
}

/// passed / (passed + failed), or 0.0 when that denominator is zero.
pub fn pass_rate(passed: usize, failed: usize) -> f64 {
    let scored = passed + failed;
    if scored == 0 {
        0.0
    } else {
        passed as f64 / scored as f64
    }
}

/// Complete result set from one conformance run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub implementation_name: String,
    /// When the run started.
    pub run_timestamp: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Digest of the check catalogue the run was executed against.
    pub registry_digest: String,
    /// Level requested by the caller, if the run was level-targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_level: Option<CertificationLevel>,
    /// Whether the run-level deadline cut the run short.
    #[serde(default)]
    pub truncated: bool,
    /// Executed protocols, in canonical order.
    pub protocols: Vec<ProtocolResult>,
    pub cross_protocol_checks: Vec<CheckResult>,
}

impl RunResult {
    pub fn protocol(&self, id: ProtocolId) -> Option<&ProtocolResult> {
        self.protocols.iter().find(|p| p.protocol == id)
    }

    pub fn executed_protocols(&self) -> Vec<ProtocolId> {
        self.protocols.iter().map(|p| p.protocol).collect()
    }

    /// Protocol id → result lookup table.
    pub fn result_table(&self) -> BTreeMap<ProtocolId, &ProtocolResult> {
        self.protocols.iter().map(|p| (p.protocol, p)).collect()
    }

    /// Total number of check results, cross-protocol checks included.
    pub fn total_checks(&self) -> usize {
        self.protocols.iter().map(|p| p.checks.len()).sum::<usize>()
            + self.cross_protocol_checks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, requirement: Requirement, status: CheckStatus) -> CheckResult {
        CheckResult {
            id: id.to_string(),
            protocol: "atp".to_string(),
            description: String::new(),
            requirement,
            status,
            message: None,
        }
    }

    #[test]
    fn test_counts_sum_to_check_count() {
        let checks = vec![
            result("a", Requirement::Must, CheckStatus::Pass),
            result("b", Requirement::Must, CheckStatus::Fail),
            result("c", Requirement::Should, CheckStatus::Skip),
            result("d", Requirement::Must, CheckStatus::Error),
            result("e", Requirement::Should, CheckStatus::Pass),
        ];
        let pr = ProtocolResult::from_checks(ProtocolId::Atp, checks);
        assert_eq!(pr.passed, 2);
        assert_eq!(pr.failed, 1);
        assert_eq!(pr.skipped, 1);
        assert_eq!(pr.errored, 1);
        assert_eq!(pr.passed + pr.failed + pr.skipped + pr.errored, pr.checks.len());
        assert!((pr.pass_rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_pass_rate_zero_when_nothing_scored() {
        let checks = vec![
            result("a", Requirement::Should, CheckStatus::Skip),
            result("b", Requirement::Must, CheckStatus::Error),
        ];
        let pr = ProtocolResult::from_checks(ProtocolId::Aip, checks);
        assert_eq!(pr.pass_rate, 0.0);
        assert_eq!(pr.scored(), 0);
        assert_eq!(pass_rate(0, 0), 0.0);
    }

    #[test]
    fn test_skip_and_error_do_not_move_pass_rate() {
        let base = vec![
            result("a", Requirement::Must, CheckStatus::Pass),
            result("b", Requirement::Must, CheckStatus::Fail),
        ];
        let mut padded = base.clone();
        padded.push(result("c", Requirement::Should, CheckStatus::Skip));
        padded.push(result("d", Requirement::Must, CheckStatus::Error));
        padded.push(result("e", Requirement::Must, CheckStatus::Error));

        let a = ProtocolResult::from_checks(ProtocolId::Atp, base);
        let b = ProtocolResult::from_checks(ProtocolId::Atp, padded);
        assert_eq!(a.pass_rate, b.pass_rate);
    }

    #[test]
    fn test_has_passing_must() {
        let only_should = ProtocolResult::from_checks(
            ProtocolId::Atp,
            vec![result("a", Requirement::Should, CheckStatus::Pass)],
        );
        assert!(!only_should.has_passing_must());

        let with_must = ProtocolResult::from_checks(
            ProtocolId::Atp,
            vec![result("a", Requirement::Must, CheckStatus::Pass)],
        );
        assert!(with_must.has_passing_must());
    }

    #[test]
    fn test_flat_record_field_names() {
        let pr = ProtocolResult::from_checks(
            ProtocolId::Atp,
            vec![result("a", Requirement::Must, CheckStatus::Pass)],
        );
        let json = serde_json::to_value(&pr).unwrap();
        assert_eq!(json["protocol_id"], "atp");
        assert_eq!(json["checks"][0]["id"], "a");
        assert_eq!(json["checks"][0]["requirement"], "MUST");
        assert_eq!(json["checks"][0]["status"], "pass");
        assert_eq!(json["pass_rate"], 1.0);
    }
}

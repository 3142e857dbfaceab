//! Certification scorer.
//!
//! Pure mapping from a [`RunResult`] to a [`CertificationResult`]. A level is
//! satisfied when the pooled overall score meets its threshold and every
//! protocol in its required set was executed with at least one passing MUST
//! check. The highest satisfied level wins; no satisfied level is `Unrated`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::levels::{CertificationLevel, LevelDefinition, LEVELS_DESCENDING, LEVEL_DEFINITIONS};
use crate::obs::emit_certification_scored;
use crate::protocol::ProtocolId;
use crate::result::{pass_rate, RunResult};

/// Per-level breakdown, for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelAssessment {
    pub level: CertificationLevel,
    pub minimum_score: f64,
    pub threshold_met: bool,
    pub required_protocols: Vec<ProtocolId>,
    /// Required protocols not executed or without a passing MUST check.
    pub missing_protocols: Vec<ProtocolId>,
    pub satisfied: bool,
}

/// Scorer output. Derived solely from a run; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationResult {
    pub achieved_level: CertificationLevel,
    /// Pooled pass rate over all executed protocols (0.0–1.0).
    pub overall_score: f64,
    pub per_protocol_pass_rates: BTreeMap<ProtocolId, f64>,
    /// Every protocol required by the achieved level was satisfied. False
    /// only when nothing was achieved.
    pub required_protocols_satisfied: bool,
    /// Gate misses against `target_level`, or against Bronze when unrated.
    pub missing_required_protocols: Vec<ProtocolId>,
    /// Level the missing-protocol diagnostic was computed against, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_level: Option<CertificationLevel>,
    /// One entry per level, highest first.
    pub level_detail: Vec<LevelAssessment>,
}

impl CertificationResult {
    pub fn assessment(&self, level: CertificationLevel) -> Option<&LevelAssessment> {
        self.level_detail.iter().find(|a| a.level == level)
    }
}

/// Maps run results onto certification levels.
pub struct CertificationScorer;

impl CertificationScorer {
    /// Score a run, diagnosing missing protocols against the run's own
    /// target level when it was level-targeted.
    pub fn score(run: &RunResult) -> CertificationResult {
        Self::score_for_target(run, run.target_level)
    }

    /// Score a run, diagnosing missing protocols against `target`.
    ///
    /// Without a target the diagnostic is empty when any level was achieved,
    /// and lists Bronze's gate misses otherwise.
    pub fn score_for_target(
        run: &RunResult,
        target: Option<CertificationLevel>,
    ) -> CertificationResult {
        let overall_score = pooled_score(run);

        let level_detail: Vec<LevelAssessment> = LEVELS_DESCENDING
            .iter()
            .filter_map(|level| level.definition())
            .map(|def| assess(run, overall_score, def))
            .collect();

        let achieved = level_detail.iter().find(|a| a.satisfied);
        let achieved_level = achieved
            .map(|a| a.level)
            .unwrap_or(CertificationLevel::Unrated);
        // Gate of the achieved level only; the target diagnostic below is separate.
        let required_protocols_satisfied =
            achieved.is_some_and(|a| a.missing_protocols.is_empty());

        let missing_required_protocols = match target {
            Some(level) => level
                .definition()
                .map(|def| gate_misses(run, def))
                .unwrap_or_default(),
            None if achieved_level == CertificationLevel::Unrated => {
                gate_misses(run, &LEVEL_DEFINITIONS[0])
            }
            None => Vec::new(),
        };

        let per_protocol_pass_rates = run
            .protocols
            .iter()
            .map(|p| (p.protocol, p.pass_rate))
            .collect();

        emit_certification_scored(&run.run_id, overall_score, achieved_level);

        CertificationResult {
            achieved_level,
            overall_score,
            per_protocol_pass_rates,
            required_protocols_satisfied,
            missing_required_protocols,
            target_level: target,
            level_detail,
        }
    }
}

/// Sum of passed over sum of passed + failed across executed protocols.
///
/// Cross-protocol checks are reported but do not enter the score.
pub fn pooled_score(run: &RunResult) -> f64 {
    let (passed, failed) = run
        .protocols
        .iter()
        .fold((0, 0), |(p, f), r| (p + r.passed, f + r.failed));
    pass_rate(passed, failed)
}

fn assess(run: &RunResult, overall_score: f64, def: &LevelDefinition) -> LevelAssessment {
    let threshold_met = overall_score >= def.minimum_score;
    let missing_protocols = gate_misses(run, def);
    LevelAssessment {
        level: def.level,
        minimum_score: def.minimum_score,
        threshold_met,
        required_protocols: def.required_protocols.to_vec(),
        satisfied: threshold_met && missing_protocols.is_empty(),
        missing_protocols,
    }
}

fn gate_misses(run: &RunResult, def: &LevelDefinition) -> Vec<ProtocolId> {
    def.required_protocols
        .iter()
        .copied()
        .filter(|p| !run.protocol(*p).is_some_and(|r| r.has_passing_must()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Requirement;
    use crate::result::{CheckResult, CheckStatus, ProtocolResult};
    use chrono::Utc;

    fn check(id: &str, requirement: Requirement, status: CheckStatus) -> CheckResult {
        CheckResult {
            id: id.to_string(),
            protocol: "test".to_string(),
            description: String::new(),
            requirement,
            status,
            message: None,
        }
    }

    /// `passed` passing MUST checks then `failed` failing MUST checks.
    fn protocol(id: ProtocolId, passed: usize, failed: usize) -> ProtocolResult {
        let mut checks = Vec::new();
        for i in 0..passed {
            checks.push(check(&format!("P-{i}"), Requirement::Must, CheckStatus::Pass));
        }
        for i in 0..failed {
            checks.push(check(&format!("F-{i}"), Requirement::Must, CheckStatus::Fail));
        }
        ProtocolResult::from_checks(id, checks)
    }

    fn run(protocols: Vec<ProtocolResult>) -> RunResult {
        RunResult {
            run_id: "run-test".to_string(),
            implementation_name: "impl".to_string(),
            run_timestamp: Utc::now(),
            completed_at: Utc::now(),
            registry_digest: String::new(),
            target_level: None,
            truncated: false,
            protocols,
            cross_protocol_checks: Vec::new(),
        }
    }

    #[test]
    fn test_only_atp_all_pass_is_bronze() {
        let r = run(vec![protocol(ProtocolId::Atp, 5, 0)]);
        let cert = CertificationScorer::score(&r);
        assert_eq!(cert.overall_score, 1.0);
        assert_eq!(cert.achieved_level, CertificationLevel::Bronze);
        assert!(cert.required_protocols_satisfied);

        let silver = cert.assessment(CertificationLevel::Silver).unwrap();
        assert!(silver.threshold_met);
        assert!(!silver.satisfied);
        assert_eq!(
            silver.missing_protocols,
            vec![ProtocolId::Aeap, ProtocolId::Aoap]
        );
    }

    #[test]
    fn test_pooled_score_weights_by_check_count() {
        // 35 / 38 = 92.1%
        let r = run(vec![
            protocol(ProtocolId::Atp, 8, 0),
            protocol(ProtocolId::Aip, 7, 1),
            protocol(ProtocolId::Aeap, 7, 1),
            protocol(ProtocolId::Amgp, 6, 1),
            protocol(ProtocolId::Aoap, 7, 0),
        ]);
        let score = pooled_score(&r);
        assert!((score - 35.0 / 38.0).abs() < 1e-12);

        let cert = CertificationScorer::score(&r);
        assert_eq!(cert.achieved_level, CertificationLevel::Gold);
        let platinum = cert.assessment(CertificationLevel::Platinum).unwrap();
        assert!(!platinum.satisfied);
        assert_eq!(
            platinum.missing_protocols,
            vec![ProtocolId::Asp, ProtocolId::Alcp]
        );
    }

    #[test]
    fn test_failed_must_gate_blocks_level_despite_score() {
        let mut protocols = vec![
            protocol(ProtocolId::Atp, 30, 0),
            protocol(ProtocolId::Aeap, 30, 0),
            protocol(ProtocolId::Amgp, 30, 0),
            protocol(ProtocolId::Aoap, 30, 0),
        ];
        protocols.insert(1, protocol(ProtocolId::Aip, 0, 1));
        let r = run(protocols);

        let cert = CertificationScorer::score_for_target(&r, Some(CertificationLevel::Gold));
        assert!(cert.overall_score >= 0.95);
        assert_eq!(cert.achieved_level, CertificationLevel::Silver);
        assert_eq!(cert.missing_required_protocols, vec![ProtocolId::Aip]);
        // Silver's own gate is clean
        assert!(cert.required_protocols_satisfied);
        let silver = cert.assessment(CertificationLevel::Silver).unwrap();
        assert!(silver.missing_protocols.is_empty());
    }

    #[test]
    fn test_no_protocols_is_unrated() {
        let cert = CertificationScorer::score(&run(Vec::new()));
        assert_eq!(cert.overall_score, 0.0);
        assert_eq!(cert.achieved_level, CertificationLevel::Unrated);
        assert!(!cert.required_protocols_satisfied);
        assert_eq!(cert.missing_required_protocols, vec![ProtocolId::Atp]);
        assert!(cert.per_protocol_pass_rates.is_empty());
    }

    #[test]
    fn test_only_should_passes_fail_the_gate() {
        let atp = ProtocolResult::from_checks(
            ProtocolId::Atp,
            vec![
                check("a", Requirement::Should, CheckStatus::Pass),
                check("b", Requirement::Must, CheckStatus::Skip),
            ],
        );
        let cert = CertificationScorer::score(&run(vec![atp]));
        assert_eq!(cert.overall_score, 1.0);
        assert_eq!(cert.achieved_level, CertificationLevel::Unrated);
    }

    #[test]
    fn test_target_diagnostic_independent_of_achieved_level() {
        let r = run(vec![protocol(ProtocolId::Atp, 4, 0)]);
        let cert = CertificationScorer::score_for_target(&r, Some(CertificationLevel::Silver));
        assert_eq!(cert.achieved_level, CertificationLevel::Bronze);
        assert_eq!(cert.target_level, Some(CertificationLevel::Silver));
        assert_eq!(
            cert.missing_required_protocols,
            vec![ProtocolId::Aeap, ProtocolId::Aoap]
        );
        assert!(cert.required_protocols_satisfied);
    }

    #[test]
    fn test_satisfied_flag_tracks_achieved_level_not_target() {
        let r = run(vec![protocol(ProtocolId::Atp, 4, 0)]);
        for target in [None, Some(CertificationLevel::Bronze), Some(CertificationLevel::Platinum)] {
            let cert = CertificationScorer::score_for_target(&r, target);
            assert_eq!(cert.achieved_level, CertificationLevel::Bronze);
            assert!(cert.required_protocols_satisfied, "target {target:?}");
        }

        let unrated = run(vec![protocol(ProtocolId::Atp, 0, 4)]);
        let cert = CertificationScorer::score_for_target(&unrated, Some(CertificationLevel::Bronze));
        assert_eq!(cert.achieved_level, CertificationLevel::Unrated);
        assert!(!cert.required_protocols_satisfied);
    }

    #[test]
    fn test_adding_passes_never_lowers_level() {
        let before = run(vec![
            protocol(ProtocolId::Atp, 3, 1),
            protocol(ProtocolId::Aeap, 3, 1),
            protocol(ProtocolId::Aoap, 3, 1),
        ]);
        let after = run(vec![
            protocol(ProtocolId::Atp, 9, 1),
            protocol(ProtocolId::Aeap, 9, 1),
            protocol(ProtocolId::Aoap, 3, 1),
        ]);
        let a = CertificationScorer::score(&before).achieved_level;
        let b = CertificationScorer::score(&after).achieved_level;
        assert_eq!(a, CertificationLevel::Silver);
        assert!(b >= a);
    }

    #[test]
    fn test_score_is_idempotent() {
        let r = run(vec![
            protocol(ProtocolId::Atp, 4, 1),
            protocol(ProtocolId::Aip, 2, 0),
        ]);
        assert_eq!(CertificationScorer::score(&r), CertificationScorer::score(&r));
    }

    #[test]
    fn test_cross_checks_do_not_enter_score() {
        let mut r = run(vec![protocol(ProtocolId::Atp, 1, 0)]);
        r.cross_protocol_checks
            .push(check("CROSS-MUST-001", Requirement::Must, CheckStatus::Fail));
        assert_eq!(pooled_score(&r), 1.0);
    }

    #[test]
    fn test_level_detail_highest_first() {
        let cert = CertificationScorer::score(&run(Vec::new()));
        let levels: Vec<_> = cert.level_detail.iter().map(|a| a.level).collect();
        assert_eq!(levels, LEVELS_DESCENDING.to_vec());
    }
}

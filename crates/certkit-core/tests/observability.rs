//! Structured tracing events emitted during a conformance run.

use certkit_core::obs::{emit_certification_scored, emit_run_truncated, RunSpan};
use certkit_core::{
    CertHistoryEntry, CertificationLevel, CertificationScorer, ConformanceRunner,
    LifecycleManager, ReferenceAdapter, RunTarget, RunnerConfig, ScriptedAdapter,
};
use tracing_test::traced_test;

#[traced_test]
#[tokio::test]
async fn run_emits_lifecycle_events() {
    let adapter = ReferenceAdapter::new();
    let run = ConformanceRunner::new(RunnerConfig::new("traced"))
        .run(RunTarget::protocols(["atp"]), &adapter)
        .await
        .unwrap();
    CertificationScorer::score(&run);

    assert!(logs_contain("run.started"));
    assert!(logs_contain("protocol.completed"));
    assert!(logs_contain("run.finished"));
    assert!(logs_contain("certification.scored"));
    assert!(logs_contain(&run.run_id));
}

#[traced_test]
#[tokio::test]
async fn errored_check_is_logged_as_warning() {
    let adapter = ScriptedAdapter::new().fail("atp", "set_trust_level", "socket closed");
    ConformanceRunner::new(RunnerConfig::new("traced"))
        .run(RunTarget::protocols(["atp"]), &adapter)
        .await
        .unwrap();

    assert!(logs_contain("WARN"));
    assert!(logs_contain("socket closed"));
}

#[traced_test]
#[test]
fn emit_helpers_do_not_panic() {
    let _span = RunSpan::enter("run-obs-001");
    emit_run_truncated("run-obs-001", 250);
    emit_certification_scored("run-obs-001", 0.92, CertificationLevel::Gold);
    assert!(logs_contain("run.truncated"));
}

#[traced_test]
#[tokio::test]
async fn record_transitions_are_logged() {
    let adapter = ReferenceAdapter::new();
    let run = ConformanceRunner::new(RunnerConfig::new("traced-record"))
        .run(RunTarget::protocols(["atp"]), &adapter)
        .await
        .unwrap();
    let certification = CertificationScorer::score(&run);
    let entry = CertHistoryEntry {
        recorded_at: chrono::Utc::now(),
        run,
        certification,
    };

    let mut manager = LifecycleManager::default();
    let record = manager.issue(&entry, chrono::Utc::now()).unwrap();
    manager
        .revoke(&record.record_id, "superseded", chrono::Utc::now())
        .unwrap();

    assert!(logs_contain("certification.lifecycle"));
    assert!(logs_contain(&record.record_id));
    assert!(logs_contain("revoked"));
}

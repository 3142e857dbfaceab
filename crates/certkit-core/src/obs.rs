//! Structured observability hooks for conformance runs.
//!
//! This module provides:
//! - Run-scoped tracing spans via `RunSpan` RAII guard
//! - Emission functions for run start, check completion, protocol
//!   completion, truncation, run finish, scoring and record lifecycle
//!   transitions
//!
//! Events are emitted at `info!` level unless noted (filter with `RUST_LOG`).

use tracing::{debug, info, warn};

use crate::levels::CertificationLevel;
use crate::protocol::ProtocolId;
use crate::result::{CheckResult, CheckStatus, ProtocolResult};

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
///
/// # Example
///
/// ```ignore
/// let _span = RunSpan::enter("run-12345");
/// // every event below carries run_id = "run-12345"
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run_id.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("certkit.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: run started for an implementation over a protocol set.
pub fn emit_run_started(run_id: &str, implementation_name: &str, protocols: &[ProtocolId]) {
    let protocols = protocols
        .iter()
        .map(ProtocolId::as_str)
        .collect::<Vec<_>>()
        .join(",");
    info!(
        event = "run.started",
        run_id = %run_id,
        implementation = %implementation_name,
        protocols = %protocols,
    );
}

/// Emit event: one check reached a terminal status (`debug`, or `warn` on error).
pub fn emit_check_completed(result: &CheckResult) {
    let message = result.message.as_deref().unwrap_or("");
    if result.status == CheckStatus::Error {
        warn!(
            event = "check.completed",
            check_id = %result.id,
            protocol = %result.protocol,
            status = %result.status,
            message = %message,
        );
    } else {
        debug!(
            event = "check.completed",
            check_id = %result.id,
            protocol = %result.protocol,
            requirement = %result.requirement,
            status = %result.status,
            message = %message,
        );
    }
}

/// Emit event: all checks of a protocol finished.
pub fn emit_protocol_completed(result: &ProtocolResult) {
    info!(
        event = "protocol.completed",
        protocol = %result.protocol,
        passed = result.passed,
        failed = result.failed,
        skipped = result.skipped,
        errored = result.errored,
        pass_rate = result.pass_rate,
    );
}

/// Emit event: the run deadline expired; remaining checks are not started.
pub fn emit_run_truncated(run_id: &str, run_timeout_ms: u64) {
    warn!(event = "run.truncated", run_id = %run_id, run_timeout_ms = run_timeout_ms);
}

/// Emit event: run finished with duration and total checks.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, total_checks: usize, truncated: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        total_checks = total_checks,
        truncated = truncated,
    );
}

/// Emit event: certification scored.
pub fn emit_certification_scored(run_id: &str, overall_score: f64, level: CertificationLevel) {
    info!(
        event = "certification.scored",
        run_id = %run_id,
        overall_score = overall_score,
        achieved_level = %level,
    );
}

/// Emit event: a certification record changed state.
pub fn emit_lifecycle_transition(record_id: &str, implementation_name: &str, kind: &str, state: &str) {
    info!(
        event = "certification.lifecycle",
        record_id = %record_id,
        implementation = %implementation_name,
        transition = kind,
        state = state,
    );
}

//! Certification report rendering (text summary, JSON, Markdown, HTML).

use std::path::Path;

use anyhow::{Context, Result};
use certkit_core::{
    CertificationLevel, CertificationResult, CheckResult, ProtocolResult, RunResult,
    REQUIREMENTS_VERSION,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Everything a downstream consumer needs from one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationReport {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub requirements_version: String,
    pub run: RunResult,
    pub certification: CertificationResult,
}

impl CertificationReport {
    pub fn new(run: RunResult, certification: CertificationResult) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            requirements_version: REQUIREMENTS_VERSION.to_string(),
            run,
            certification,
        }
    }
}

pub fn render_json(report: &CertificationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("serialize certification report")
}

/// Read a JSON report written by `certkit run --format json`.
pub fn read_report(path: &Path) -> Result<CertificationReport> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("parse report {:?}", path))
}

/// Write rendered output, creating parent directories.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

fn pct(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn level_label(level: CertificationLevel) -> String {
    match level.definition() {
        Some(def) => def.display_name.to_string(),
        None => "Not certified".to_string(),
    }
}

fn protocol_list(ids: &[certkit_core::ProtocolId]) -> String {
    ids.iter()
        .map(|p| p.as_str().to_uppercase())
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Plain-text console summary.
pub fn render_text(report: &CertificationReport) -> String {
    let run = &report.run;
    let cert = &report.certification;
    let mut out = String::new();

    out.push_str(&format!("Implementation: {}\n", run.implementation_name));
    out.push_str(&format!("Run ID:         {}\n", run.run_id));
    out.push_str(&format!(
        "Achieved:       {} ({})\n",
        cert.achieved_level.as_str().to_uppercase(),
        level_label(cert.achieved_level)
    ));
    out.push_str(&format!("Overall score:  {}\n", pct(cert.overall_score)));
    if run.truncated {
        out.push_str("Run truncated:  run timeout expired\n");
    }
    out.push('\n');

    out.push_str(&format!(
        "{:<10} {:>8} {:>7} {:>7} {:>8} {:>8}\n",
        "PROTOCOL", "SCORE", "PASSED", "FAILED", "SKIPPED", "ERRORED"
    ));
    for p in &run.protocols {
        out.push_str(&format!(
            "{:<10} {:>8} {:>7} {:>7} {:>8} {:>8}\n",
            p.protocol.as_str().to_uppercase(),
            pct(p.pass_rate),
            p.passed,
            p.failed,
            p.skipped,
            p.errored
        ));
    }

    if !cert.missing_required_protocols.is_empty() {
        out.push_str(&format!(
            "\nMissing required protocols{}: {}\n",
            cert.target_level
                .map(|l| format!(" for {l}"))
                .unwrap_or_default(),
            protocol_list(&cert.missing_required_protocols)
        ));
    }
    out
}

/// Markdown report for repository docs or release notes.
pub fn render_markdown(report: &CertificationReport) -> String {
    let sections = [
        markdown_header(report),
        markdown_summary(report),
        markdown_protocols(&report.run),
        markdown_cross(&report.run.cross_protocol_checks),
        markdown_levels(&report.certification),
    ];
    let mut out = sections
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

fn markdown_header(report: &CertificationReport) -> String {
    let run = &report.run;
    format!(
        "# Certification Report\n\n\
         > **Self-assessment.** Generated locally by `certkit` {} from the \
         implementer's own test run. This is not a third-party audit.\n\n\
         **Implementation:** {}  \n\
         **Run ID:** `{}`  \n\
         **Date:** {}  \n\
         **Requirements:** {} (`{}`)",
        report.tool_version,
        run.implementation_name,
        run.run_id,
        run.run_timestamp.format("%Y-%m-%d %H:%M UTC"),
        report.requirements_version,
        &run.registry_digest[..run.registry_digest.len().min(12)],
    )
}

fn markdown_summary(report: &CertificationReport) -> String {
    let cert = &report.certification;
    let mut rows = vec![
        "## Summary".to_string(),
        String::new(),
        "| Field | Value |".to_string(),
        "|---|---|".to_string(),
        format!("| Overall Score | **{}** |", pct(cert.overall_score)),
        format!(
            "| Achieved Level | **{}** |",
            cert.achieved_level.as_str().to_uppercase()
        ),
        format!("| Protocols Run | {} |", report.run.protocols.len()),
        format!(
            "| Required Protocols Satisfied | {} |",
            if cert.required_protocols_satisfied { "Yes" } else { "No" }
        ),
    ];
    if let Some(def) = cert.achieved_level.definition() {
        rows.push(format!("| Display Name | {} |", def.display_name));
        rows.push(format!("| Badge Color | `{}` |", def.badge_color));
    }
    if let Some(target) = cert.target_level {
        rows.push(format!("| Target Level | {} |", target.as_str().to_uppercase()));
    }
    if !cert.missing_required_protocols.is_empty() {
        rows.push(format!(
            "| Missing Protocols | {} |",
            protocol_list(&cert.missing_required_protocols)
        ));
    }
    if report.run.truncated {
        rows.push("| Run Truncated | Yes |".to_string());
    }
    rows.join("\n")
}

fn check_rows(checks: &[CheckResult]) -> Vec<String> {
    let mut rows = vec![
        "| Check ID | Description | Level | Status | Message |".to_string(),
        "|---|---|---|---|---|".to_string(),
    ];
    rows.extend(checks.iter().map(|c| {
        format!(
            "| `{}` | {} | {} | {} | {} |",
            c.id,
            escape_cell(&c.description),
            c.requirement,
            c.status.as_str().to_uppercase(),
            escape_cell(c.message.as_deref().unwrap_or(""))
        )
    }));
    rows
}

fn markdown_protocol(p: &ProtocolResult) -> String {
    let mut lines = vec![
        format!("### {}", p.protocol.display_name()),
        String::new(),
        format!(
            "**Score:** {} ({}/{} scored checks passed, {} skipped, {} errored)",
            pct(p.pass_rate),
            p.passed,
            p.scored(),
            p.skipped,
            p.errored
        ),
        String::new(),
    ];
    lines.extend(check_rows(&p.checks));
    lines.join("\n")
}

fn markdown_protocols(run: &RunResult) -> String {
    if run.protocols.is_empty() {
        return "## Protocol Results\n\n*No protocols were run.*".to_string();
    }
    let mut sections = vec!["## Protocol Results".to_string()];
    sections.extend(run.protocols.iter().map(markdown_protocol));
    sections.join("\n\n")
}

fn markdown_cross(checks: &[CheckResult]) -> String {
    if checks.is_empty() {
        return String::new();
    }
    let mut lines = vec![
        "## Cross-Protocol Checks".to_string(),
        String::new(),
        "Reported for visibility; not included in the overall score.".to_string(),
        String::new(),
    ];
    lines.extend(check_rows(checks));
    lines.join("\n")
}

fn markdown_levels(cert: &CertificationResult) -> String {
    let mut lines = vec!["## Level Detail".to_string(), String::new()];
    for a in &cert.level_detail {
        let status = if a.satisfied { "achieved" } else { "not satisfied" };
        lines.push(format!("### {}: {status}", a.level.as_str().to_uppercase()));
        lines.push(String::new());
        lines.push(format!(
            "- Minimum score: {} ({})",
            pct(a.minimum_score),
            if a.threshold_met { "met" } else { "not met" }
        ));
        lines.push(format!(
            "- Required protocols: {}",
            protocol_list(&a.required_protocols)
        ));
        if !a.missing_protocols.is_empty() {
            lines.push(format!(
                "- Missing protocols: {}",
                protocol_list(&a.missing_protocols)
            ));
        }
        lines.push(String::new());
    }
    lines.join("\n").trim_end().to_string()
}

const HTML_STYLE: &str = "\
body { font-family: system-ui, sans-serif; font-size: 14px; color: #212529; background: #f8f9fa; margin: 0; padding: 32px; }
.report { max-width: 900px; margin: 0 auto; background: #fff; border: 1px solid #dee2e6; border-radius: 8px; padding: 32px; }
h2 { border-bottom: 1px solid #dee2e6; padding-bottom: 6px; }
table { width: 100%; border-collapse: collapse; margin: 8px 0; }
th, td { border: 1px solid #dee2e6; padding: 6px 10px; text-align: left; }
th { background: #f1f3f5; }
.notice { background: #fff3cd; border: 1px solid #ffc107; border-radius: 4px; padding: 12px 16px; }
.badge { display: inline-block; padding: 4px 12px; border-radius: 12px; font-weight: 700; }
.status-pass { color: #198754; font-weight: 600; }
.status-fail { color: #dc3545; font-weight: 600; }
.status-skip { color: #6c757d; }
.status-error { color: #fd7e14; font-weight: 600; }
.meta, footer { color: #6c757d; font-size: 0.85rem; }
";

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Standalone HTML report. Styles are inline; the page loads nothing else.
pub fn render_html(report: &CertificationReport) -> String {
    let run = &report.run;
    let cert = &report.certification;
    let mut body = Vec::new();

    body.push(format!(
        "<h1>Certification Report</h1>\n\
         <p class=\"meta\">{} &middot; run <code>{}</code> &middot; {} &middot; requirements {}</p>\n\
         <p class=\"notice\"><strong>Self-assessment.</strong> Generated locally by certkit {} \
         from the implementer's own test run. This is not a third-party audit.</p>",
        escape_html(&run.implementation_name),
        escape_html(&run.run_id),
        run.run_timestamp.format("%Y-%m-%d %H:%M UTC"),
        escape_html(&report.requirements_version),
        escape_html(&report.tool_version),
    ));

    let (colour, label) = match cert.achieved_level.definition() {
        Some(def) => (def.badge_color, def.display_name),
        None => ("#9F9F9F", "Not certified"),
    };
    let mut summary = vec![
        "<h2>Summary</h2>".to_string(),
        "<table>".to_string(),
        format!(
            "<tr><th>Achieved Level</th><td><span class=\"badge\" style=\"background: {colour}\">{}</span> {}</td></tr>",
            cert.achieved_level.as_str().to_uppercase(),
            escape_html(label)
        ),
        format!("<tr><th>Overall Score</th><td>{}</td></tr>", pct(cert.overall_score)),
        format!("<tr><th>Protocols Run</th><td>{}</td></tr>", run.protocols.len()),
        format!(
            "<tr><th>Required Protocols Satisfied</th><td>{}</td></tr>",
            if cert.required_protocols_satisfied { "Yes" } else { "No" }
        ),
    ];
    if let Some(target) = cert.target_level {
        summary.push(format!(
            "<tr><th>Target Level</th><td>{}</td></tr>",
            target.as_str().to_uppercase()
        ));
    }
    if !cert.missing_required_protocols.is_empty() {
        summary.push(format!(
            "<tr><th>Missing Protocols</th><td>{}</td></tr>",
            protocol_list(&cert.missing_required_protocols)
        ));
    }
    if run.truncated {
        summary.push("<tr><th>Run Truncated</th><td>Yes</td></tr>".to_string());
    }
    summary.push("</table>".to_string());
    body.push(summary.join("\n"));

    body.push("<h2>Protocol Results</h2>".to_string());
    if run.protocols.is_empty() {
        body.push("<p><em>No protocols were run.</em></p>".to_string());
    }
    for p in &run.protocols {
        body.push(format!(
            "<h3>{}</h3>\n<p>Score: {} ({}/{} scored checks passed, {} skipped, {} errored)</p>\n{}",
            escape_html(p.protocol.display_name()),
            pct(p.pass_rate),
            p.passed,
            p.scored(),
            p.skipped,
            p.errored,
            html_check_table(&p.checks)
        ));
    }

    if !run.cross_protocol_checks.is_empty() {
        body.push(format!(
            "<h2>Cross-Protocol Checks</h2>\n\
             <p>Reported for visibility; not included in the overall score.</p>\n{}",
            html_check_table(&run.cross_protocol_checks)
        ));
    }

    let mut levels = vec![
        "<h2>Level Detail</h2>".to_string(),
        "<table>".to_string(),
        "<tr><th>Level</th><th>Minimum Score</th><th>Required Protocols</th><th>Missing</th><th>Status</th></tr>".to_string(),
    ];
    levels.extend(cert.level_detail.iter().map(|a| {
        format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            a.level.as_str().to_uppercase(),
            pct(a.minimum_score),
            protocol_list(&a.required_protocols),
            protocol_list(&a.missing_protocols),
            if a.satisfied { "achieved" } else { "not satisfied" }
        )
    }));
    levels.push("</table>".to_string());
    body.push(levels.join("\n"));

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Certification Report: {}</title>\n<style>\n{HTML_STYLE}</style>\n</head>\n\
         <body>\n<div class=\"report\">\n{}\n<footer>Generated by certkit {}</footer>\n\
         </div>\n</body>\n</html>\n",
        escape_html(&run.implementation_name),
        body.join("\n"),
        escape_html(&report.tool_version),
    )
}

fn html_check_table(checks: &[CheckResult]) -> String {
    let mut rows = vec![
        "<table>".to_string(),
        "<tr><th>Check ID</th><th>Description</th><th>Level</th><th>Status</th><th>Message</th></tr>".to_string(),
    ];
    rows.extend(checks.iter().map(|c| {
        format!(
            "<tr><td><code>{}</code></td><td>{}</td><td>{}</td><td class=\"status-{}\">{}</td><td>{}</td></tr>",
            escape_html(&c.id),
            escape_html(&c.description),
            c.requirement,
            c.status.as_str(),
            c.status.as_str().to_uppercase(),
            escape_html(c.message.as_deref().unwrap_or(""))
        )
    }));
    rows.push("</table>".to_string());
    rows.join("\n")
}

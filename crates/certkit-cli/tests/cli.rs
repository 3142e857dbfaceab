//! Black-box tests for the `certkit` binary.

use std::path::Path;
use std::process::{Command, Output};

fn certkit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_certkit"))
        .args(args)
        .env_remove("CERTKIT_HISTORY_FILE")
        .env_remove("CERTKIT_IMPLEMENTATION_NAME")
        .env_remove("CERTKIT_RECORDS_FILE")
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn certkit")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn run_reference_json_reports_platinum() {
    let out = certkit(&["run", "--format", "json"]);
    assert!(out.status.success(), "{}", stderr(&out));

    let report: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("json report");
    assert_eq!(report["certification"]["achieved_level"], "platinum");
    assert_eq!(report["certification"]["overall_score"], 1.0);
    assert_eq!(report["run"]["implementation_name"], "certkit-reference");
    assert_eq!(report["run"]["protocols"].as_array().unwrap().len(), 7);
}

#[test]
fn run_text_summary_by_level() {
    let out = certkit(&["run", "--level", "silver", "--name", "acme"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("Implementation: acme"));
    assert!(text.contains("SILVER"));
    assert!(text.contains("AEAP"));
    assert!(!text.contains("AMGP"));
}

#[test]
fn unknown_protocol_is_rejected() {
    let out = certkit(&["run", "--protocols", "atp,xyz"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("unknown protocol: xyz"));
}

#[test]
fn missing_fixture_is_construction_error() {
    let out = certkit(&["run", "--fixture", "/no/such/fixture.json"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("adapter could not be constructed"));
}

#[test]
fn fixture_drives_scripted_run() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = dir.path().join("fixture.json");
    std::fs::write(
        &fixture,
        r#"{
            "implementation_name": "scripted-impl",
            "fallback": "reference",
            "operations": {
                "aip": {
                    "register_identity": { "kind": "not_supported" },
                    "lookup_identity": { "kind": "not_supported" },
                    "validate_credential": { "kind": "not_supported" },
                    "revoke_identity": { "kind": "not_supported" }
                }
            }
        }"#,
    )
    .unwrap();

    let out = certkit(&[
        "run",
        "--fixture",
        fixture.to_str().unwrap(),
        "--level",
        "gold",
        "--format",
        "json",
    ]);
    assert!(out.status.success(), "{}", stderr(&out));
    let report: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(report["run"]["implementation_name"], "scripted-impl");
    assert_eq!(report["certification"]["achieved_level"], "silver");
    assert_eq!(
        report["certification"]["missing_required_protocols"],
        serde_json::json!(["aip"])
    );
}

#[test]
fn fail_under_gates_exit_code() {
    let out = certkit(&["run", "--protocols", "atp", "--fail-under", "silver"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("below required silver"));

    let ok = certkit(&["run", "--protocols", "atp", "--fail-under", "bronze"]);
    assert!(ok.status.success(), "{}", stderr(&ok));
}

#[test]
fn markdown_report_and_badge_files() {
    let dir = tempfile::tempdir().unwrap();
    let md = dir.path().join("reports/cert.md");
    let json = dir.path().join("reports/cert.json");
    let svg = dir.path().join("badge.svg");

    let out = certkit(&["run", "--format", "markdown", "--output", md.to_str().unwrap()]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = std::fs::read_to_string(&md).unwrap();
    assert!(text.starts_with("# Certification Report"));

    let out = certkit(&[
        "run",
        "--protocols",
        "atp",
        "--format",
        "json",
        "--output",
        json.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", stderr(&out));

    let out = certkit(&[
        "badge",
        "--report",
        json.to_str().unwrap(),
        "--output",
        svg.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", stderr(&out));
    let badge = std::fs::read_to_string(&svg).unwrap();
    assert!(badge.contains(">Bronze</text>"));
}

#[test]
fn history_records_runs() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history.jsonl");
    let history_arg = history.to_str().unwrap();

    for name in ["first", "second"] {
        let out = certkit(&["run", "--name", name, "--history", history_arg]);
        assert!(out.status.success(), "{}", stderr(&out));
    }
    assert!(Path::new(&history).exists());

    let out = certkit(&["history", "--file", history_arg]);
    assert!(out.status.success(), "{}", stderr(&out));
    let lines: Vec<String> = stdout(&out).lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("second"));
    assert!(lines[0].contains("platinum"));

    let out = certkit(&["history", "--file", history_arg, "--implementation", "first"]);
    assert_eq!(stdout(&out).lines().count(), 1);
}

#[test]
fn levels_lists_thresholds() {
    let out = certkit(&["levels"]);
    assert!(out.status.success());
    let text = stdout(&out);
    for level in ["bronze", "silver", "gold", "platinum"] {
        assert!(text.contains(level));
    }
    assert!(text.contains("95%"));
}

#[test]
fn html_report_is_self_contained() {
    let out = certkit(&["run", "--protocols", "atp,aeap", "--format", "html"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let html = stdout(&out);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Certification Report: certkit-reference"));
    assert!(html.contains("ATP-MUST-001"));
    assert!(!html.contains("<script") && !html.contains("<link"));
}

#[test]
fn record_lifecycle_from_recorded_run() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history.jsonl");
    let store = dir.path().join("records.json");
    let history_arg = history.to_str().unwrap();
    let store_arg = store.to_str().unwrap();

    let out = certkit(&["run", "--level", "silver", "--name", "acme", "--history", history_arg]);
    assert!(out.status.success(), "{}", stderr(&out));

    let out = certkit(&["record", "--store", store_arg, "issue", "--history", history_arg]);
    assert!(out.status.success(), "{}", stderr(&out));
    let issued = stdout(&out);
    assert!(issued.contains("acme") && issued.contains("silver") && issued.contains("active"));
    let record_id = issued.split_whitespace().next().unwrap().to_string();

    // renewal without a fresh run is refused under the default policy
    let out = certkit(&["record", "--store", store_arg, "renew", &record_id]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("requires a fresh assessment"));

    let out = certkit(&["run", "--name", "acme", "--history", history_arg]);
    assert!(out.status.success(), "{}", stderr(&out));
    let out = certkit(&[
        "record", "--store", store_arg, "renew", &record_id, "--history", history_arg,
    ]);
    assert!(out.status.success(), "{}", stderr(&out));
    // level stays as issued even though the new run reached platinum
    assert!(stdout(&out).contains("silver"));
    assert!(stdout(&out).contains("renewals 1"));

    let out = certkit(&["record", "--store", store_arg, "revoke", &record_id, "--reason", "retired"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let out = certkit(&["record", "--store", store_arg, "reinstate", &record_id]);
    assert!(!out.status.success());

    let out = certkit(&["record", "--store", store_arg, "events", &record_id]);
    let events: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let kinds: Vec<_> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, ["issued", "renewed", "revoked"]);

    let out = certkit(&["record", "list", "--store", store_arg]);
    assert!(stdout(&out).contains("revoked"));
}

#[test]
fn record_issue_refuses_unrated_run() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history.jsonl");
    let store = dir.path().join("records.json");
    let out = certkit(&[
        "run", "--level", "unrated", "--history", history.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", stderr(&out));

    let out = certkit(&[
        "record", "--store", store.to_str().unwrap(), "issue", "--history",
        history.to_str().unwrap(),
    ]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("achieved no certification level"));
    assert!(!store.exists());
}

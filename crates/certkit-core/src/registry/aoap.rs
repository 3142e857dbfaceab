//! AOAP (Agent Observability and Accountability Protocol) checks.

use serde_json::{json, Value};

use crate::check::{expect_field, expect_list, expect_true, CheckDefinition};

const AOAP: &str = "aoap";

pub fn checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::must(
            "AOAP-MUST-001",
            AOAP,
            "append_audit_entry",
            "Audit log append is supported with entry identifier",
            json!({
                "agent_id": "test-agent-aoap-001",
                "event_type": "tool_call",
                "decision": "allow",
                "context": { "tool": "read_file", "path": "/tmp/test" },
            }),
            entry_appended,
        ),
        CheckDefinition::must(
            "AOAP-MUST-002",
            AOAP,
            "export_audit_log",
            "Audit log JSON export is supported",
            json!({ "format": "json", "agent_id": "test-agent-aoap-001" }),
            entries_listed,
        ),
        CheckDefinition::should(
            "AOAP-SHOULD-001",
            AOAP,
            "verify_audit_chain",
            "Offline audit log integrity verification is supported",
            json!({ "agent_id": "test-agent-aoap-001" }),
            chain_verified,
        ),
        CheckDefinition::must(
            "AOAP-MUST-003",
            AOAP,
            "query_audit_entries",
            "Audit log query by event type is supported",
            json!({ "agent_id": "test-agent-aoap-001", "event_type": "tool_call" }),
            entries_listed,
        ),
    ]
}

fn entry_appended(r: &Value) -> Result<(), String> {
    expect_true(r, "appended")?;
    expect_field(r, "entry_id")
}

fn entries_listed(r: &Value) -> Result<(), String> {
    expect_list(r, "entries")
}

fn chain_verified(r: &Value) -> Result<(), String> {
    expect_field(r, "valid")
}

//! AMGP (Agent Memory Governance Protocol) checks.

use serde_json::{json, Value};

use crate::check::{expect_false, expect_field, expect_list, expect_mentions, expect_true, CheckDefinition};

const AMGP: &str = "amgp";

pub fn checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::must(
            "AMGP-MUST-001",
            AMGP,
            "write_memory_record",
            "Memory record writing with retention policy is supported",
            json!({
                "agent_id": "test-agent-amgp-001",
                "record_type": "observation",
                "content": { "data": "test-memory-content" },
                "retention_policy": "session",
            }),
            record_written,
        ),
        CheckDefinition::must(
            "AMGP-MUST-002",
            AMGP,
            "query_memory_records",
            "Memory records can be queried by retention policy",
            json!({ "agent_id": "test-agent-amgp-001", "retention_policy": "session" }),
            records_listed,
        ),
        CheckDefinition::must(
            "AMGP-MUST-003",
            AMGP,
            "delete_memory_record",
            "Memory record deletion is supported",
            json!({ "record_id": "test-record-amgp-delete", "requested_by": "owner-001" }),
            record_deleted,
        ),
        CheckDefinition::should(
            "AMGP-SHOULD-001",
            AMGP,
            "write_memory_record",
            "Long-term retention requires a consent token",
            json!({
                "agent_id": "test-agent-amgp-001",
                "record_type": "observation",
                "content": { "data": "test-long-term-content" },
                "retention_policy": "long_term",
                "consent_token": null,
            }),
            consent_enforced,
        ),
    ]
}

fn record_written(r: &Value) -> Result<(), String> {
    expect_true(r, "written")?;
    expect_field(r, "record_id")
}

fn records_listed(r: &Value) -> Result<(), String> {
    expect_list(r, "records")
}

fn record_deleted(r: &Value) -> Result<(), String> {
    expect_true(r, "deleted")
}

fn consent_enforced(r: &Value) -> Result<(), String> {
    expect_false(r, "written")?;
    expect_mentions(r, "consent")
}

//! ATP (Agent Trust Protocol) checks.
//!
//! Trust levels are assigned and changed explicitly by an owner; checks
//! only observe the static decisions the implementation makes.

use serde_json::{json, Value};

use crate::check::{expect_false, expect_field, expect_list, expect_str, expect_true, CheckDefinition};

const ATP: &str = "atp";

pub fn checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::must(
            "ATP-MUST-001",
            ATP,
            "set_trust_level",
            "Trust level assignment is supported",
            json!({ "agent_id": "test-agent-001", "level": "L2" }),
            trust_level_assigned,
        ),
        CheckDefinition::must(
            "ATP-MUST-002",
            ATP,
            "check_trust_requirement",
            "Trust level enforcement rejects insufficient level",
            json!({
                "agent_id": "test-agent-001",
                "required_level": "L3",
                "current_level": "L2",
            }),
            insufficient_level_denied,
        ),
        CheckDefinition::must(
            "ATP-MUST-003",
            ATP,
            "change_trust_level",
            "Trust level changes require explicit owner authorization",
            json!({
                "agent_id": "test-agent-001",
                "new_level": "L3",
                "authorized_by": "owner-001",
            }),
            owner_authorized_change,
        ),
        CheckDefinition::must(
            "ATP-MUST-004",
            ATP,
            "check_trust_requirement",
            "Structured denial returned when trust level is insufficient",
            json!({
                "agent_id": "test-agent-002",
                "required_level": "L5",
                "current_level": "L1",
            }),
            structured_denial,
        ),
        CheckDefinition::should(
            "ATP-SHOULD-001",
            ATP,
            "get_recent_audit_entries",
            "Audit entries are recorded for trust decisions",
            json!({ "limit": 10 }),
            audit_entries_listed,
        ),
    ]
}

fn trust_level_assigned(r: &Value) -> Result<(), String> {
    expect_true(r, "success")
}

fn insufficient_level_denied(r: &Value) -> Result<(), String> {
    expect_false(r, "allowed")
}

fn owner_authorized_change(r: &Value) -> Result<(), String> {
    expect_true(r, "success")?;
    expect_str(r, "authorized_by", "owner-001")
}

fn structured_denial(r: &Value) -> Result<(), String> {
    expect_false(r, "allowed")?;
    expect_field(r, "reason")
}

fn audit_entries_listed(r: &Value) -> Result<(), String> {
    expect_list(r, "entries")
}

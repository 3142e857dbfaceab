//! ASP (Agent Scope Protocol) checks.

use serde_json::{json, Value};

use crate::check::{expect_false, expect_field, expect_list, expect_true, CheckDefinition};

const ASP: &str = "asp";

pub fn checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::must(
            "ASP-MUST-001",
            ASP,
            "declare_scope",
            "Agent scope declaration is supported",
            json!({
                "agent_id": "test-agent-asp-001",
                "scope": {
                    "tools": ["read_file", "search"],
                    "resources": ["/tmp"],
                },
                "declared_by": "owner-001",
            }),
            scope_declared,
        ),
        CheckDefinition::must(
            "ASP-MUST-002",
            ASP,
            "check_scope",
            "Actions inside the declared scope are allowed",
            json!({ "agent_id": "test-agent-asp-001", "action": "read_file" }),
            in_scope_allowed,
        ),
        CheckDefinition::must(
            "ASP-MUST-003",
            ASP,
            "check_scope",
            "Actions outside the declared scope are denied with a reason",
            json!({ "agent_id": "test-agent-asp-001", "action": "delete_database" }),
            out_of_scope_denied,
        ),
        CheckDefinition::should(
            "ASP-SHOULD-001",
            ASP,
            "get_scope",
            "Declared scope can be read back",
            json!({ "agent_id": "test-agent-asp-001" }),
            scope_readable,
        ),
    ]
}

fn scope_declared(r: &Value) -> Result<(), String> {
    expect_true(r, "declared")?;
    expect_field(r, "scope_id")
}

fn in_scope_allowed(r: &Value) -> Result<(), String> {
    expect_true(r, "allowed")
}

fn out_of_scope_denied(r: &Value) -> Result<(), String> {
    expect_false(r, "allowed")?;
    expect_field(r, "reason")
}

fn scope_readable(r: &Value) -> Result<(), String> {
    let scope = r
        .get("scope")
        .ok_or_else(|| format!("missing field 'scope' in response: {r}"))?;
    expect_list(scope, "tools")
}

//! ALCP (Agent Lifecycle Protocol) checks.
//!
//! The catalogue walks one agent through `created → active → suspended →
//! retired`; each step depends on the adapter state left by the previous one.

use serde_json::{json, Value};

use crate::check::{expect_list, expect_str, expect_true, CheckDefinition};

const ALCP: &str = "alcp";
const AGENT: &str = "test-agent-alcp-001";

pub fn checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::must(
            "ALCP-MUST-001",
            ALCP,
            "register_agent",
            "Agent registration starts in the created state",
            json!({ "agent_id": AGENT, "owner": "owner-001" }),
            agent_created,
        ),
        CheckDefinition::must(
            "ALCP-MUST-002",
            ALCP,
            "activate_agent",
            "Activation requires explicit owner authorization",
            json!({ "agent_id": AGENT, "authorized_by": "owner-001" }),
            agent_active,
        ),
        CheckDefinition::must(
            "ALCP-MUST-003",
            ALCP,
            "suspend_agent",
            "Active agents can be suspended",
            json!({ "agent_id": AGENT, "authorized_by": "owner-001", "reason": "test-suspension" }),
            agent_suspended,
        ),
        CheckDefinition::must(
            "ALCP-MUST-004",
            ALCP,
            "retire_agent",
            "Agents can be retired permanently",
            json!({ "agent_id": AGENT, "authorized_by": "owner-001" }),
            agent_retired,
        ),
        CheckDefinition::should(
            "ALCP-SHOULD-001",
            ALCP,
            "get_lifecycle_history",
            "Lifecycle transitions are recorded",
            json!({ "agent_id": AGENT }),
            transitions_listed,
        ),
    ]
}

fn agent_created(r: &Value) -> Result<(), String> {
    expect_true(r, "registered")?;
    expect_str(r, "state", "created")
}

fn agent_active(r: &Value) -> Result<(), String> {
    expect_str(r, "state", "active")
}

fn agent_suspended(r: &Value) -> Result<(), String> {
    expect_str(r, "state", "suspended")
}

fn agent_retired(r: &Value) -> Result<(), String> {
    expect_str(r, "state", "retired")
}

fn transitions_listed(r: &Value) -> Result<(), String> {
    expect_list(r, "transitions")
}

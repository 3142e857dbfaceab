//! AEAP (Agent Economic Action Protocol) checks. Spend limits are static
//! values configured by the owner.

use serde_json::{json, Value};

use crate::check::{expect_false, expect_field, expect_true, CheckDefinition};

const AEAP: &str = "aeap";

pub fn checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::must(
            "AEAP-MUST-001",
            AEAP,
            "check_spend_allowed",
            "Static spend limit enforcement is supported",
            json!({
                "agent_id": "test-agent-aeap-001",
                "amount": 100,
                "currency": "USD",
                "period": "daily",
            }),
            spend_decision_returned,
        ),
        CheckDefinition::must(
            "AEAP-MUST-002",
            AEAP,
            "record_spend",
            "Spend events are recorded with a unique identifier",
            json!({
                "agent_id": "test-agent-aeap-001",
                "amount": 10,
                "currency": "USD",
                "description": "test-spend-event",
            }),
            spend_recorded,
        ),
        CheckDefinition::must(
            "AEAP-MUST-003",
            AEAP,
            "get_budget_status",
            "Budget status query returns remaining and limit fields",
            json!({ "agent_id": "test-agent-aeap-001", "period": "daily" }),
            budget_status_reported,
        ),
        CheckDefinition::must(
            "AEAP-MUST-004",
            AEAP,
            "check_spend_allowed",
            "Spend requests exceeding the static limit are denied",
            json!({
                "agent_id": "test-agent-aeap-001",
                "amount": 999_999_999u64,
                "currency": "USD",
                "period": "daily",
            }),
            over_limit_denied,
        ),
    ]
}

fn spend_decision_returned(r: &Value) -> Result<(), String> {
    expect_field(r, "allowed")
}

fn spend_recorded(r: &Value) -> Result<(), String> {
    expect_true(r, "recorded")?;
    expect_field(r, "spend_id")
}

fn budget_status_reported(r: &Value) -> Result<(), String> {
    expect_field(r, "remaining")?;
    expect_field(r, "limit")
}

fn over_limit_denied(r: &Value) -> Result<(), String> {
    expect_false(r, "allowed")
}

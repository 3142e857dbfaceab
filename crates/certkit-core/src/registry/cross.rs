//! Cross-protocol checks.
//!
//! These validate observable priority and consistency between protocols,
//! e.g. an ATP denial outranks remaining AEAP budget. They run after all
//! single-protocol checks and may require earlier checks to have passed.

use serde_json::{json, Value};

use crate::check::{
    expect_false, expect_list, expect_mentions, expect_str, CheckDefinition, CrossProtocolCheck,
};
use crate::protocol::{ProtocolId, CROSS_PROTOCOL};

use super::aip::REVOKED_AGENT_ID;

pub fn checks() -> Vec<CrossProtocolCheck> {
    vec![
        CrossProtocolCheck::new(
            CheckDefinition::must(
                "CROSS-MUST-001",
                CROSS_PROTOCOL,
                "check_action_allowed",
                "Insufficient trust blocks economic actions (ATP > AEAP priority)",
                json!({
                    "agent_id": "test-agent-cross-001",
                    "action_type": "economic_spend",
                    "trust_level": "L1",
                    "required_trust_level": "L3",
                    "budget_remaining": 1000,
                    "amount": 10,
                }),
                trust_gate_blocks_spend,
            ),
            &[ProtocolId::Atp, ProtocolId::Aeap],
        ),
        CrossProtocolCheck::new(
            CheckDefinition::must(
                "CROSS-MUST-002",
                CROSS_PROTOCOL,
                "assign_trust_with_identity_check",
                "Trust assignment requires verified identity (AIP prerequisite for ATP)",
                json!({
                    "agent_id": "test-agent-cross-002",
                    "requested_level": "L2",
                    "identity_verified": false,
                }),
                identity_required_for_trust,
            ),
            &[ProtocolId::Aip, ProtocolId::Atp],
        ),
        // Invoked through ATP so the adapter must consult identity state
        // left behind by AIP-MUST-004.
        CrossProtocolCheck::new(
            CheckDefinition::must(
                "CROSS-MUST-003",
                "atp",
                "check_trust_requirement",
                "An identity revoked via AIP fails subsequent ATP trust checks",
                json!({
                    "agent_id": REVOKED_AGENT_ID,
                    "required_level": "L1",
                    "current_level": "L3",
                }),
                revoked_identity_denied,
            ),
            &[ProtocolId::Aip, ProtocolId::Atp],
        )
        .with_prerequisite(ProtocolId::Aip, "AIP-MUST-004"),
        CrossProtocolCheck::new(
            CheckDefinition::should(
                "CROSS-SHOULD-001",
                CROSS_PROTOCOL,
                "get_denial_audit_entries",
                "Audit log covers denied actions from all protocols",
                json!({ "agent_id": "test-agent-cross-001" }),
                denials_audited,
            ),
            &[ProtocolId::Atp, ProtocolId::Aoap],
        ),
    ]
}

fn trust_gate_blocks_spend(r: &Value) -> Result<(), String> {
    expect_false(r, "allowed")?;
    expect_str(r, "blocked_by", "atp")
}

fn identity_required_for_trust(r: &Value) -> Result<(), String> {
    expect_false(r, "success")?;
    expect_mentions(r, "identity")
}

fn revoked_identity_denied(r: &Value) -> Result<(), String> {
    expect_false(r, "allowed")?;
    expect_mentions(r, "revoked")
}

fn denials_audited(r: &Value) -> Result<(), String> {
    expect_list(r, "entries")
}

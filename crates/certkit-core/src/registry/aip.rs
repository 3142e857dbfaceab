//! AIP (Agent Identity Protocol) checks: registration, lookup, credential
//! validation and revocation.

use serde_json::{json, Value};

use crate::check::{expect_false, expect_field, expect_true, CheckDefinition};

const AIP: &str = "aip";

/// Agent id revoked by AIP-MUST-004; cross-protocol checks reuse it.
pub const REVOKED_AGENT_ID: &str = "test-agent-aip-revoke";

pub fn checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::must(
            "AIP-MUST-001",
            AIP,
            "register_identity",
            "Agent identity registration is supported",
            json!({
                "agent_id": "test-agent-aip-001",
                "public_key": "test-public-key-placeholder",
                "metadata": { "version": "1.0" },
            }),
            identity_registered,
        ),
        CheckDefinition::must(
            "AIP-MUST-002",
            AIP,
            "lookup_identity",
            "Agent identity lookup is supported",
            json!({ "agent_id": "test-agent-aip-001" }),
            identity_found,
        ),
        CheckDefinition::must(
            "AIP-MUST-003",
            AIP,
            "validate_credential",
            "Credential validation rejects invalid credentials",
            json!({
                "agent_id": "test-agent-aip-001",
                "credential_type": "api_key",
                "credential_value": "invalid-credential-for-test",
            }),
            credential_rejected,
        ),
        CheckDefinition::must(
            "AIP-MUST-004",
            AIP,
            "revoke_identity",
            "Agent identity revocation is supported",
            json!({
                "agent_id": REVOKED_AGENT_ID,
                "reason": "test-revocation",
                "revoked_by": "owner-001",
            }),
            identity_revoked,
        ),
    ]
}

fn identity_registered(r: &Value) -> Result<(), String> {
    expect_true(r, "registered")?;
    expect_field(r, "identity_id")
}

fn identity_found(r: &Value) -> Result<(), String> {
    expect_field(r, "identity_id").or_else(|_| expect_field(r, "agent_id"))
}

fn credential_rejected(r: &Value) -> Result<(), String> {
    expect_false(r, "valid")
}

fn identity_revoked(r: &Value) -> Result<(), String> {
    expect_true(r, "revoked")
}

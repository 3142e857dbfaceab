//! Check definitions and response assertions.
//!
//! A [`CheckDefinition`] is immutable once registered: it names the adapter
//! operation to invoke, the payload to send, and the assertion the response
//! must satisfy. Assertions are plain function pointers so the catalogue can
//! be cloned and compared without capturing state.

use serde_json::Value;

use crate::protocol::{ProtocolId, Requirement};

/// Predicate over an adapter response. `Err` carries the failure message.
pub type Assertion = fn(&Value) -> Result<(), String>;

/// A single conformance requirement.
#[derive(Debug, Clone)]
pub struct CheckDefinition {
    /// Identifier, unique within its protocol (e.g. `ATP-MUST-001`).
    pub id: &'static str,
    /// Namespace passed to the adapter (`"atp"`, ..., or `"cross_protocol"`).
    pub protocol: &'static str,
    pub requirement: Requirement,
    /// Operation name passed to the adapter.
    pub operation: &'static str,
    pub description: &'static str,
    /// Input payload template.
    pub payload: Value,
    pub assertion: Assertion,
}

impl CheckDefinition {
    /// A MUST-level check.
    pub fn must(
        id: &'static str,
        protocol: &'static str,
        operation: &'static str,
        description: &'static str,
        payload: Value,
        assertion: Assertion,
    ) -> Self {
        Self {
            id,
            protocol,
            requirement: Requirement::Must,
            operation,
            description,
            payload,
            assertion,
        }
    }

    /// A SHOULD-level check.
    pub fn should(
        id: &'static str,
        protocol: &'static str,
        operation: &'static str,
        description: &'static str,
        payload: Value,
        assertion: Assertion,
    ) -> Self {
        Self {
            requirement: Requirement::Should,
            ..Self::must(id, protocol, operation, description, payload, assertion)
        }
    }

    /// Apply the assertion to a response.
    pub fn evaluate(&self, response: &Value) -> Result<(), String> {
        (self.assertion)(response)
    }
}

/// A check spanning several protocols.
///
/// Runs after every single-protocol check. It is skipped when any protocol in
/// `depends_on` was not executed, or when any check listed in `prerequisites`
/// did not pass in the result table.
#[derive(Debug, Clone)]
pub struct CrossProtocolCheck {
    pub definition: CheckDefinition,
    pub depends_on: Vec<ProtocolId>,
    /// `(protocol, check id)` pairs that must have passed.
    pub prerequisites: Vec<(ProtocolId, &'static str)>,
}

impl CrossProtocolCheck {
    pub fn new(definition: CheckDefinition, depends_on: &[ProtocolId]) -> Self {
        Self {
            definition,
            depends_on: depends_on.to_vec(),
            prerequisites: Vec::new(),
        }
    }

    pub fn with_prerequisite(mut self, protocol: ProtocolId, check_id: &'static str) -> Self {
        self.prerequisites.push((protocol, check_id));
        self
    }
}

// ---------------------------------------------------------------------------
// Assertion helpers
// ---------------------------------------------------------------------------

/// `field` must be the JSON boolean `true`.
pub fn expect_true(response: &Value, field: &str) -> Result<(), String> {
    match response.get(field) {
        Some(Value::Bool(true)) => Ok(()),
        _ => Err(format!("expected '{field}' to be true, got: {response}")),
    }
}

/// `field` must be the JSON boolean `false`.
pub fn expect_false(response: &Value, field: &str) -> Result<(), String> {
    match response.get(field) {
        Some(Value::Bool(false)) => Ok(()),
        _ => Err(format!("expected '{field}' to be false, got: {response}")),
    }
}

/// `field` must be present (any value).
pub fn expect_field(response: &Value, field: &str) -> Result<(), String> {
    if response.get(field).is_some() {
        Ok(())
    } else {
        Err(format!("missing field '{field}' in response: {response}"))
    }
}

/// `field` must be a JSON array.
pub fn expect_list(response: &Value, field: &str) -> Result<(), String> {
    match response.get(field) {
        Some(Value::Array(_)) => Ok(()),
        _ => Err(format!("expected '{field}' list in response, got: {response}")),
    }
}

/// `field` must be a string equal to `expected`.
pub fn expect_str(response: &Value, field: &str, expected: &str) -> Result<(), String> {
    match response.get(field).and_then(Value::as_str) {
        Some(actual) if actual == expected => Ok(()),
        _ => Err(format!(
            "expected '{field}' to be \"{expected}\", got: {response}"
        )),
    }
}

/// The serialized response must mention `needle` (case-insensitive).
pub fn expect_mentions(response: &Value, needle: &str) -> Result<(), String> {
    if response.to_string().to_lowercase().contains(needle) {
        Ok(())
    } else {
        Err(format!("response does not mention '{needle}': {response}"))
    }
}

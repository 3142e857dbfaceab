//! Protocol identifiers and requirement strength.

use serde::{Deserialize, Serialize};

use crate::error::CertifyError;

/// Invocation namespace used by cross-protocol checks.
pub const CROSS_PROTOCOL: &str = "cross_protocol";

/// One of the seven governance protocols.
///
/// Variant order is the canonical execution order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolId {
    /// Agent Trust Protocol
    Atp,
    /// Agent Identity Protocol
    Aip,
    /// Agent Scope Protocol
    Asp,
    /// Agent Economic Action Protocol
    Aeap,
    /// Agent Memory Governance Protocol
    Amgp,
    /// Agent Observability and Accountability Protocol
    Aoap,
    /// Agent Lifecycle Protocol
    Alcp,
}

impl ProtocolId {
    /// All protocols in canonical execution order.
    pub const ALL: [ProtocolId; 7] = [
        ProtocolId::Atp,
        ProtocolId::Aip,
        ProtocolId::Asp,
        ProtocolId::Aeap,
        ProtocolId::Amgp,
        ProtocolId::Aoap,
        ProtocolId::Alcp,
    ];

    /// Wire identifier passed to adapters (`"atp"`, `"aip"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolId::Atp => "atp",
            ProtocolId::Aip => "aip",
            ProtocolId::Asp => "asp",
            ProtocolId::Aeap => "aeap",
            ProtocolId::Amgp => "amgp",
            ProtocolId::Aoap => "aoap",
            ProtocolId::Alcp => "alcp",
        }
    }

    /// Human-readable protocol name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProtocolId::Atp => "Agent Trust Protocol",
            ProtocolId::Aip => "Agent Identity Protocol",
            ProtocolId::Asp => "Agent Scope Protocol",
            ProtocolId::Aeap => "Agent Economic Action Protocol",
            ProtocolId::Amgp => "Agent Memory Governance Protocol",
            ProtocolId::Aoap => "Agent Observability and Accountability Protocol",
            ProtocolId::Alcp => "Agent Lifecycle Protocol",
        }
    }

    /// Parse a protocol id, case-insensitively.
    pub fn parse(id: &str) -> Result<Self, CertifyError> {
        let normalized = id.trim().to_ascii_lowercase();
        ProtocolId::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| CertifyError::UnknownProtocol {
                protocol: id.to_string(),
            })
    }
}

impl std::fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProtocolId {
    type Err = CertifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProtocolId::parse(s)
    }
}

/// RFC 2119 requirement strength of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Requirement {
    #[serde(rename = "MUST")]
    Must,
    #[serde(rename = "SHOULD")]
    Should,
}

impl Requirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Requirement::Must => "MUST",
            Requirement::Should => "SHOULD",
        }
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_matches_ord() {
        let mut shuffled = vec![
            ProtocolId::Alcp,
            ProtocolId::Atp,
            ProtocolId::Aoap,
            ProtocolId::Asp,
            ProtocolId::Aip,
            ProtocolId::Amgp,
            ProtocolId::Aeap,
        ];
        shuffled.sort();
        assert_eq!(shuffled, ProtocolId::ALL.to_vec());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ProtocolId::parse("ATP").unwrap(), ProtocolId::Atp);
        assert_eq!(ProtocolId::parse(" aoap ").unwrap(), ProtocolId::Aoap);
    }

    #[test]
    fn test_parse_unknown_protocol() {
        let err = ProtocolId::parse("xyz").unwrap_err();
        assert!(matches!(err, CertifyError::UnknownProtocol { .. }));
    }

    #[test]
    fn test_serde_uses_wire_ids() {
        let json = serde_json::to_string(&ProtocolId::Aeap).unwrap();
        assert_eq!(json, "\"aeap\"");
        let req = serde_json::to_string(&Requirement::Should).unwrap();
        assert_eq!(req, "\"SHOULD\"");
    }
}

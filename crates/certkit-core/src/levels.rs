//! Certification level definitions.
//!
//! Thresholds and required protocol sets are fixed and published here in
//! full. Thresholds strictly increase and required sets grow from Bronze to
//! Platinum, so satisfying a level implies satisfying every level below it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CertifyError;
use crate::protocol::ProtocolId;

/// Achievable certification levels. `Unrated` means no level was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificationLevel {
    Unrated,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl CertificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificationLevel::Unrated => "unrated",
            CertificationLevel::Bronze => "bronze",
            CertificationLevel::Silver => "silver",
            CertificationLevel::Gold => "gold",
            CertificationLevel::Platinum => "platinum",
        }
    }

    /// The published definition, or `None` for `Unrated`.
    pub fn definition(&self) -> Option<&'static LevelDefinition> {
        LEVEL_DEFINITIONS.iter().find(|d| d.level == *self)
    }
}

impl std::fmt::Display for CertificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CertificationLevel {
    type Err = CertifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unrated" => Ok(CertificationLevel::Unrated),
            "bronze" => Ok(CertificationLevel::Bronze),
            "silver" => Ok(CertificationLevel::Silver),
            "gold" => Ok(CertificationLevel::Gold),
            "platinum" => Ok(CertificationLevel::Platinum),
            _ => Err(CertifyError::UnknownLevel(s.to_string())),
        }
    }
}

/// Criteria for a single certification level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelDefinition {
    pub level: CertificationLevel,
    /// Minimum pooled pass rate (0.0–1.0).
    pub minimum_score: f64,
    pub required_protocols: &'static [ProtocolId],
    pub badge_color: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
}

/// Published level definitions, lowest first.
pub const LEVEL_DEFINITIONS: [LevelDefinition; 4] = [
    LevelDefinition {
        level: CertificationLevel::Bronze,
        minimum_score: 0.60,
        required_protocols: &[ProtocolId::Atp],
        badge_color: "#CD7F32",
        display_name: "Certified Bronze (Self-Assessed)",
        description: "Satisfies at least 60% of all conformance checks and covers \
                      the Agent Trust Protocol (ATP).",
    },
    LevelDefinition {
        level: CertificationLevel::Silver,
        minimum_score: 0.75,
        required_protocols: &[ProtocolId::Atp, ProtocolId::Aeap, ProtocolId::Aoap],
        badge_color: "#C0C0C0",
        display_name: "Certified Silver (Self-Assessed)",
        description: "Satisfies at least 75% of all conformance checks and covers \
                      ATP, AEAP and AOAP.",
    },
    LevelDefinition {
        level: CertificationLevel::Gold,
        minimum_score: 0.90,
        required_protocols: &[
            ProtocolId::Atp,
            ProtocolId::Aip,
            ProtocolId::Aeap,
            ProtocolId::Amgp,
            ProtocolId::Aoap,
        ],
        badge_color: "#FFD700",
        display_name: "Certified Gold (Self-Assessed)",
        description: "Satisfies at least 90% of all conformance checks and covers \
                      ATP, AIP, AEAP, AMGP and AOAP.",
    },
    LevelDefinition {
        level: CertificationLevel::Platinum,
        minimum_score: 0.95,
        required_protocols: &ProtocolId::ALL,
        badge_color: "#E5E4E2",
        display_name: "Certified Platinum (Self-Assessed)",
        description: "Satisfies at least 95% of all conformance checks and covers \
                      all seven governance protocols.",
    },
];

/// Levels in scoring order, highest first.
pub const LEVELS_DESCENDING: [CertificationLevel; 4] = [
    CertificationLevel::Platinum,
    CertificationLevel::Gold,
    CertificationLevel::Silver,
    CertificationLevel::Bronze,
];

/// Protocols that must run so every level up to `level` can be scored.
pub fn protocols_for_level(level: CertificationLevel) -> BTreeSet<ProtocolId> {
    LEVEL_DEFINITIONS
        .iter()
        .filter(|d| d.level <= level)
        .flat_map(|d| d.required_protocols.iter().copied())
        .collect()
}

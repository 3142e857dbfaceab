//! Check registry.
//!
//! Holds the ordered check catalogue for each of the seven protocols plus the
//! cross-protocol catalogue. [`CheckRegistry::standard`] is the published
//! requirement set; [`CheckRegistry::digest`] identifies exactly which
//! version of it a run was executed against.

pub mod aeap;
pub mod aip;
pub mod alcp;
pub mod amgp;
pub mod aoap;
pub mod asp;
pub mod atp;
pub mod cross;

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::check::{CheckDefinition, CrossProtocolCheck};
use crate::error::{CertifyError, Result};
use crate::protocol::{ProtocolId, CROSS_PROTOCOL};

/// Version label of the published requirement set.
pub const REQUIREMENTS_VERSION: &str = "1.0.0";

/// Per-protocol check catalogues.
#[derive(Debug, Clone, Default)]
pub struct CheckRegistry {
    protocols: BTreeMap<ProtocolId, Vec<CheckDefinition>>,
    cross_protocol: Vec<CrossProtocolCheck>,
}

impl CheckRegistry {
    /// An empty registry, for custom catalogues.
    pub fn new() -> Self {
        Self::default()
    }

    /// The published catalogue for all seven protocols.
    pub fn standard() -> Self {
        let mut protocols = BTreeMap::new();
        protocols.insert(ProtocolId::Atp, atp::checks());
        protocols.insert(ProtocolId::Aip, aip::checks());
        protocols.insert(ProtocolId::Asp, asp::checks());
        protocols.insert(ProtocolId::Aeap, aeap::checks());
        protocols.insert(ProtocolId::Amgp, amgp::checks());
        protocols.insert(ProtocolId::Aoap, aoap::checks());
        protocols.insert(ProtocolId::Alcp, alcp::checks());

        Self {
            protocols,
            cross_protocol: cross::checks(),
        }
    }

    /// Append a check to a protocol's catalogue. Ids must be unique per protocol.
    pub fn register(&mut self, protocol: ProtocolId, definition: CheckDefinition) -> Result<()> {
        let checks = self.protocols.entry(protocol).or_default();
        if checks.iter().any(|c| c.id == definition.id) {
            return Err(CertifyError::DuplicateCheck {
                scope: protocol.to_string(),
                check_id: definition.id.to_string(),
            });
        }
        checks.push(definition);
        Ok(())
    }

    /// Append a cross-protocol check. Ids must be unique among cross checks.
    pub fn register_cross(&mut self, check: CrossProtocolCheck) -> Result<()> {
        if self
            .cross_protocol
            .iter()
            .any(|c| c.definition.id == check.definition.id)
        {
            return Err(CertifyError::DuplicateCheck {
                scope: CROSS_PROTOCOL.to_string(),
                check_id: check.definition.id.to_string(),
            });
        }
        self.cross_protocol.push(check);
        Ok(())
    }

    /// Ordered checks for a protocol id string.
    ///
    /// Fails with [`CertifyError::UnknownProtocol`] for anything but the
    /// seven recognised ids.
    pub fn checks_for(&self, protocol: &str) -> Result<&[CheckDefinition]> {
        let id = ProtocolId::parse(protocol)?;
        Ok(self.checks(id))
    }

    /// Ordered checks for a protocol; empty when none are registered.
    pub fn checks(&self, protocol: ProtocolId) -> &[CheckDefinition] {
        self.protocols
            .get(&protocol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Published requirement-set version label.
    pub fn version(&self) -> &'static str {
        REQUIREMENTS_VERSION
    }

    pub fn cross_protocol_checks(&self) -> &[CrossProtocolCheck] {
        &self.cross_protocol
    }

    /// Number of single-protocol checks plus cross-protocol checks.
    pub fn len(&self) -> usize {
        self.protocols.values().map(Vec::len).sum::<usize>() + self.cross_protocol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// SHA-256 over the ordered catalogue (ids, requirements, operations,
    /// payloads). Any change to the requirement set changes the digest.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        let cross = self
            .cross_protocol
            .iter()
            .map(|c| (CROSS_PROTOCOL, &c.definition));
        let single = self
            .protocols
            .iter()
            .flat_map(|(p, checks)| checks.iter().map(move |c| (p.as_str(), c)));

        for (scope, def) in single.chain(cross) {
            for part in [
                scope,
                def.id,
                def.requirement.as_str(),
                def.protocol,
                def.operation,
            ] {
                hasher.update(part.as_bytes());
                hasher.update(b"\0");
            }
            hasher.update(def.payload.to_string().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

//! Error taxonomy for certkit.
//!
//! Only [`CertifyError::UnknownProtocol`] and
//! [`CertifyError::AdapterConstruction`] can escape a conformance run. Every
//! per-check fault is absorbed by the runner and recorded as a terminal
//! check status instead.

/// certkit errors.
#[derive(Debug, thiserror::Error)]
pub enum CertifyError {
    #[error("unknown protocol: {protocol} (recognised: atp, aip, asp, aeap, amgp, aoap, alcp)")]
    UnknownProtocol { protocol: String },

    #[error("adapter could not be constructed: {0}")]
    AdapterConstruction(String),

    #[error("duplicate check '{check_id}' registered for {scope}")]
    DuplicateCheck { scope: String, check_id: String },

    #[error("unknown certification level: {0}")]
    UnknownLevel(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for certkit operations.
pub type Result<T> = std::result::Result<T, CertifyError>;

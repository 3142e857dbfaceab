//! Adapter contract: the only boundary between the engine and the system
//! under assessment.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure reported by an adapter invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// The implementation does not support this operation.
    #[error("operation '{operation}' is not supported")]
    NotSupported { operation: String },

    /// Any other failure while invoking the implementation.
    #[error("{0}")]
    Failed(String),
}

impl AdapterError {
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Connects an implementation under test to the conformance runner.
///
/// The runner awaits each invocation to completion before issuing the next,
/// so implementations may rely on the side effects of earlier calls within
/// the same run. A response must be a JSON object; anything else is treated
/// as malformed. Dropping the returned future cancels the invocation.
#[async_trait]
pub trait ImplementationAdapter: Send + Sync {
    async fn invoke(
        &self,
        protocol: &str,
        operation: &str,
        payload: &Value,
    ) -> Result<Value, AdapterError>;
}

#[async_trait]
impl<A: ImplementationAdapter + ?Sized> ImplementationAdapter for std::sync::Arc<A> {
    async fn invoke(
        &self,
        protocol: &str,
        operation: &str,
        payload: &Value,
    ) -> Result<Value, AdapterError> {
        (**self).invoke(protocol, operation, payload).await
    }
}

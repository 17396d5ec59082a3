//! Domain error types.

use thiserror::Error;

/// A proposed transition broke one of the loan contract's rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{command} rejected: {reason}")]
pub struct ValidationError {
    /// The command being verified.
    pub command: &'static str,

    /// Which rule was broken.
    pub reason: String,
}

impl ValidationError {
    pub fn new(command: &'static str, reason: impl Into<String>) -> Self {
        Self {
            command,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A transition was rejected by the contract.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A state did not hold the expected kind of record.
    #[error("Unexpected record type: expected {expected}, found {found}")]
    UnexpectedRecordType {
        expected: &'static str,
        found: String,
    },

    /// The id inside a record payload does not match the state's linear id.
    #[error("Record id {payload_id} does not match linear id {linear_id}")]
    RecordIdMismatch {
        linear_id: common::LinearId,
        payload_id: common::LinearId,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;

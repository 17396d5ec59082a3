use common::{LinearId, Party};
use thiserror::Error;

use crate::{StateRef, TxId};

/// Errors that can occur when interacting with the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A signer's local verification rejected the transaction.
    #[error("Transaction rejected by {party}: {reason}")]
    ValidationRejected { party: Party, reason: String },

    /// A required signer could not be contacted or did not answer in time.
    #[error("Signer {party} unreachable: {reason}")]
    SignerUnreachable { party: Party, reason: String },

    /// An input state was already consumed by another transaction.
    #[error("Input state {state_ref} was already consumed by transaction {consumed_by}")]
    ConflictingVersion { state_ref: StateRef, consumed_by: TxId },

    /// An input state does not exist on the ledger.
    #[error("State not found: {0}")]
    StateNotFound(StateRef),

    /// A transaction tried to issue a linear record whose id is already in use.
    #[error("Linear id {0} already exists on the ledger")]
    DuplicateLinearId(LinearId),

    /// The transaction is structurally invalid and was never sent for signing.
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    /// A subscriber fell behind the change feed and missed states.
    #[error("Subscription lagged behind by {0} states")]
    SubscriptionLagged(u64),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    /// Returns true if the error was caused by losing an optimistic race.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            LedgerError::ConflictingVersion { .. } | LedgerError::DuplicateLinearId(_)
        )
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::ValidationRejected { .. } => "validation_rejected",
            LedgerError::SignerUnreachable { .. } => "signer_unreachable",
            LedgerError::ConflictingVersion { .. } => "conflicting_version",
            LedgerError::StateNotFound(_) => "state_not_found",
            LedgerError::DuplicateLinearId(_) => "duplicate_linear_id",
            LedgerError::MalformedTransaction(_) => "malformed_transaction",
            LedgerError::SubscriptionLagged(_) => "subscription_lagged",
            LedgerError::Serialization(_) => "serialization",
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

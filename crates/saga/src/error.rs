//! Saga error types.

use common::{LinearId, Party};
use domain::DomainError;
use ledger::LedgerError;
use thiserror::Error;

use crate::state::SagaStep;

/// Errors that can occur while running a step flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A signer's contract rejected the transition. Never retried.
    #[error("Transition rejected by {party}: {reason}")]
    ValidationRejected { party: Party, reason: String },

    /// The record is missing or has already moved past the expected state.
    #[error("{record_type} {id} not found: {detail}")]
    RecordNotFound {
        record_type: &'static str,
        id: LinearId,
        detail: String,
    },

    /// Another submission consumed the same version first.
    #[error("Conflicting version: {0}")]
    ConflictingVersion(String),

    /// A counterparty did not sign in time.
    #[error("Signer {party} unreachable: {reason}")]
    SignerUnreachable { party: Party, reason: String },

    /// An external decision service failed.
    #[error("Decision service error: {0}")]
    Decision(String),

    /// Any other ledger error.
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// An observer was handed a step it does not run.
    #[error("{observer} does not handle step {step}")]
    StepNotHandled {
        observer: &'static str,
        step: SagaStep,
    },
}

impl FlowError {
    pub(crate) fn not_found(
        record_type: &'static str,
        id: LinearId,
        detail: impl Into<String>,
    ) -> Self {
        FlowError::RecordNotFound {
            record_type,
            id,
            detail: detail.into(),
        }
    }

    /// Returns true if the trigger that started the flow was already handled.
    ///
    /// Observers treat these as dropped duplicates rather than failures.
    pub fn is_stale_trigger(&self) -> bool {
        matches!(
            self,
            FlowError::RecordNotFound { .. } | FlowError::ConflictingVersion(_)
        )
    }

    /// Returns true if re-querying and trying once more may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlowError::ConflictingVersion(_))
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::ValidationRejected { .. } => "validation_rejected",
            FlowError::RecordNotFound { .. } => "record_not_found",
            FlowError::ConflictingVersion(_) => "conflicting_version",
            FlowError::SignerUnreachable { .. } => "signer_unreachable",
            FlowError::Decision(_) => "decision",
            FlowError::Ledger(_) => "ledger",
            FlowError::Domain(_) => "domain",
            FlowError::StepNotHandled { .. } => "step_not_handled",
        }
    }
}

impl From<LedgerError> for FlowError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ValidationRejected { party, reason } => {
                FlowError::ValidationRejected { party, reason }
            }
            LedgerError::SignerUnreachable { party, reason } => {
                FlowError::SignerUnreachable { party, reason }
            }
            err if err.is_conflict() => FlowError::ConflictingVersion(err.to_string()),
            err => FlowError::Ledger(err),
        }
    }
}

/// Convenience type alias for flow results.
pub type Result<T> = std::result::Result<T, FlowError>;

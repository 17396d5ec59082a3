//! Domain layer of the loan-approval network.
//!
//! This crate provides:
//! - The [`LinearRecord`] trait for records stored as version chains on the ledger
//! - The three loan saga records and their status machines
//! - [`LoanCommand`], the single command each loan transaction carries
//! - [`LoanContract`], the pure transition rules every signer checks
//! - [`PartyVerifier`], the per-party signing hook registered with the ledger

pub mod error;
pub mod loan;
pub mod record;
pub mod verifier;

pub use error::{DomainError, Result, ValidationError};
pub use loan::{
    AbstractStatus, BankProcessingRecord, BankProcessingStatus, CreditCheckRecord,
    CreditScoreDesc, LoanApplicationRecord, LoanApplicationStatus, LoanCommand, LoanContract,
    LoanTerms, MIN_CREDIT_SCORE, bank_outcome, credit_outcome, disbursement_decision,
};
pub use record::{LinearRecord, Versioned};
pub use verifier::PartyVerifier;

//! Loan saga records and their transition rules.

mod commands;
mod contract;
mod records;
mod state;
mod value_objects;

pub use commands::LoanCommand;
pub use contract::{LoanContract, MIN_CREDIT_SCORE};
pub use records::{BankProcessingRecord, CreditCheckRecord, LoanApplicationRecord};
pub use state::{
    AbstractStatus, BankProcessingStatus, CreditScoreDesc, LoanApplicationStatus, bank_outcome,
    credit_outcome, disbursement_decision,
};
pub use value_objects::LoanTerms;

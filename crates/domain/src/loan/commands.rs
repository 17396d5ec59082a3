//! Loan commands.

use common::{LinearId, Party};
use ledger::CommandEnvelope;
use serde::{Deserialize, Serialize};

use super::{
    BankProcessingRecord, BankProcessingStatus, CreditCheckRecord, CreditScoreDesc,
    LoanApplicationRecord,
};
use crate::error::ValidationError;
use crate::record::LinearRecord;

/// The intent carried by a loan transaction.
///
/// Exactly one command travels with each transaction and names the transition
/// the signers are asked to agree to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LoanCommand {
    /// Issue a new application.
    ApplyForLoan,

    /// Move an applied application to the credit agency.
    ForwardToCreditCheck { credit_check_id: LinearId },

    /// Issue the credit check record.
    InitiateCreditCheck,

    /// Score a pending credit check.
    PostCreditCheckResult,

    /// Copy a credit result onto the application.
    RecordCreditResult {
        credit_check_id: LinearId,
        credit_score_desc: CreditScoreDesc,
    },

    /// Move a passed application to the bank.
    ForwardToBank { bank_processing_id: LinearId },

    /// Issue the bank processing record.
    InitiateBankProcessing,

    /// Decide a pending bank request.
    PostBankResult,

    /// Copy the bank decision onto the application.
    RecordBankResult {
        bank_processing_id: LinearId,
        processing_status: BankProcessingStatus,
    },
}

impl LoanCommand {
    /// Returns the command name.
    pub fn command_type(&self) -> &'static str {
        match self {
            LoanCommand::ApplyForLoan => "ApplyForLoan",
            LoanCommand::ForwardToCreditCheck { .. } => "ForwardToCreditCheck",
            LoanCommand::InitiateCreditCheck => "InitiateCreditCheck",
            LoanCommand::PostCreditCheckResult => "PostCreditCheckResult",
            LoanCommand::RecordCreditResult { .. } => "RecordCreditResult",
            LoanCommand::ForwardToBank { .. } => "ForwardToBank",
            LoanCommand::InitiateBankProcessing => "InitiateBankProcessing",
            LoanCommand::PostBankResult => "PostBankResult",
            LoanCommand::RecordBankResult { .. } => "RecordBankResult",
        }
    }

    /// The record type the command produces.
    pub fn record_type(&self) -> &'static str {
        match self {
            LoanCommand::ApplyForLoan
            | LoanCommand::ForwardToCreditCheck { .. }
            | LoanCommand::RecordCreditResult { .. }
            | LoanCommand::ForwardToBank { .. }
            | LoanCommand::RecordBankResult { .. } => LoanApplicationRecord::RECORD_TYPE,
            LoanCommand::InitiateCreditCheck | LoanCommand::PostCreditCheckResult => {
                CreditCheckRecord::RECORD_TYPE
            }
            LoanCommand::InitiateBankProcessing | LoanCommand::PostBankResult => {
                BankProcessingRecord::RECORD_TYPE
            }
        }
    }

    /// Returns true if the command issues a new record rather than superseding one.
    pub fn is_issuance(&self) -> bool {
        matches!(
            self,
            LoanCommand::ApplyForLoan
                | LoanCommand::InitiateCreditCheck
                | LoanCommand::InitiateBankProcessing
        )
    }

    /// The exact set of parties that must sign the command.
    pub fn signers(&self) -> Vec<Party> {
        match self {
            LoanCommand::InitiateCreditCheck | LoanCommand::PostCreditCheckResult => {
                vec![Party::FinanceAgency, Party::CreditAgency]
            }
            LoanCommand::InitiateBankProcessing | LoanCommand::PostBankResult => {
                vec![Party::FinanceAgency, Party::Bank]
            }
            _ => vec![Party::FinanceAgency],
        }
    }

    /// The party whose node starts the step. Results are posted by the party
    /// that decided them; every other step is driven by the finance agency.
    pub fn initiator(&self) -> Party {
        match self {
            LoanCommand::PostCreditCheckResult => Party::CreditAgency,
            LoanCommand::PostBankResult => Party::Bank,
            _ => Party::FinanceAgency,
        }
    }

    /// Wraps the command for a transaction, with its required signers.
    pub fn to_envelope(&self) -> Result<CommandEnvelope, serde_json::Error> {
        Ok(CommandEnvelope::new(
            self.command_type(),
            serde_json::to_value(self)?,
            self.signers(),
        ))
    }

    /// Reads a command back from a transaction.
    pub fn from_envelope(envelope: &CommandEnvelope) -> Result<Self, ValidationError> {
        let command: LoanCommand = serde_json::from_value(envelope.payload.clone())
            .map_err(|e| ValidationError::new("transaction", format!("unknown command: {e}")))?;
        if command.command_type() != envelope.command_type {
            return Err(ValidationError::new(
                command.command_type(),
                format!(
                    "command envelope is labelled {}",
                    envelope.command_type
                ),
            ));
        }
        Ok(command)
    }
}

//! Saga step table.

use common::Party;
use domain::{
    BankProcessingRecord, BankProcessingStatus, CreditCheckRecord, CreditScoreDesc, LinearRecord,
    LoanApplicationRecord, LoanApplicationStatus,
};
use ledger::StateEnvelope;
use serde::{Deserialize, Serialize};

/// A unit of progress in the loan saga, owned by exactly one party.
///
/// Step order:
/// ```text
/// ForwardToCreditCheck ──► InitiateCreditCheck ──► ScoreCreditCheck ──► RecordCreditResult
///                                                                              │ PASS
/// RecordBankResult ◄── DecideBankProcessing ◄── InitiateBankProcessing ◄── ForwardToBank
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SagaStep {
    ForwardToCreditCheck,
    InitiateCreditCheck,
    ScoreCreditCheck,
    RecordCreditResult,
    ForwardToBank,
    InitiateBankProcessing,
    DecideBankProcessing,
    RecordBankResult,
}

impl SagaStep {
    pub const ALL: [SagaStep; 8] = [
        SagaStep::ForwardToCreditCheck,
        SagaStep::InitiateCreditCheck,
        SagaStep::ScoreCreditCheck,
        SagaStep::RecordCreditResult,
        SagaStep::ForwardToBank,
        SagaStep::InitiateBankProcessing,
        SagaStep::DecideBankProcessing,
        SagaStep::RecordBankResult,
    ];

    /// The party whose node runs this step.
    pub fn owner(&self) -> Party {
        match self {
            SagaStep::ScoreCreditCheck => Party::CreditAgency,
            SagaStep::DecideBankProcessing => Party::Bank,
            _ => Party::FinanceAgency,
        }
    }

    /// The flow that carries out this step.
    pub fn flow(&self) -> &'static str {
        match self {
            SagaStep::ForwardToCreditCheck => "forward_to_credit_check",
            SagaStep::InitiateCreditCheck => "initiate_credit_check",
            SagaStep::ScoreCreditCheck => "score_credit_check",
            SagaStep::RecordCreditResult => "record_credit_result",
            SagaStep::ForwardToBank => "forward_to_bank",
            SagaStep::InitiateBankProcessing => "initiate_bank_processing",
            SagaStep::DecideBankProcessing => "post_bank_result",
            SagaStep::RecordBankResult => "record_bank_result",
        }
    }

    /// The record type whose committed states trigger this step.
    pub fn record_type(&self) -> &'static str {
        match self {
            SagaStep::ForwardToCreditCheck
            | SagaStep::InitiateCreditCheck
            | SagaStep::ForwardToBank
            | SagaStep::InitiateBankProcessing => LoanApplicationRecord::RECORD_TYPE,
            SagaStep::ScoreCreditCheck | SagaStep::RecordCreditResult => {
                CreditCheckRecord::RECORD_TYPE
            }
            SagaStep::DecideBankProcessing | SagaStep::RecordBankResult => {
                BankProcessingRecord::RECORD_TYPE
            }
        }
    }

    /// The step a newly committed state calls for, if any.
    ///
    /// Initiation steps are never triggered on their own. They run right
    /// after the forward that assigns their record's id.
    pub fn triggered_by(state: &StateEnvelope) -> Option<SagaStep> {
        let field = |name: &str| state.field(name).and_then(serde_json::Value::as_str);

        if state.record_type == LoanApplicationRecord::RECORD_TYPE {
            match field(LoanApplicationRecord::STATUS_FIELD)? {
                s if s == LoanApplicationStatus::Applied.as_str() => {
                    Some(SagaStep::ForwardToCreditCheck)
                }
                s if s == LoanApplicationStatus::CreditScoreCheckPass.as_str() => {
                    Some(SagaStep::ForwardToBank)
                }
                _ => None,
            }
        } else if state.record_type == CreditCheckRecord::RECORD_TYPE {
            if field(CreditCheckRecord::DESC_FIELD)? == CreditScoreDesc::Unspecified.as_str() {
                Some(SagaStep::ScoreCreditCheck)
            } else {
                Some(SagaStep::RecordCreditResult)
            }
        } else if state.record_type == BankProcessingRecord::RECORD_TYPE {
            if field(BankProcessingRecord::STATUS_FIELD)?
                == BankProcessingStatus::InProcessing.as_str()
            {
                Some(SagaStep::DecideBankProcessing)
            } else {
                Some(SagaStep::RecordBankResult)
            }
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStep::ForwardToCreditCheck => "ForwardToCreditCheck",
            SagaStep::InitiateCreditCheck => "InitiateCreditCheck",
            SagaStep::ScoreCreditCheck => "ScoreCreditCheck",
            SagaStep::RecordCreditResult => "RecordCreditResult",
            SagaStep::ForwardToBank => "ForwardToBank",
            SagaStep::InitiateBankProcessing => "InitiateBankProcessing",
            SagaStep::DecideBankProcessing => "DecideBankProcessing",
            SagaStep::RecordBankResult => "RecordBankResult",
        }
    }
}

impl std::fmt::Display for SagaStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

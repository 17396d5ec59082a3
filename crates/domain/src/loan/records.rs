//! The three linear records of a loan saga.
//!
//! Records link to each other by id only. Each is stored and versioned on
//! its own, so a link is a foreign key, never an embedded record.

use common::{LinearId, Party};
use serde::{Deserialize, Serialize};

use super::{BankProcessingStatus, CreditScoreDesc, LoanApplicationStatus, LoanTerms};
use crate::record::LinearRecord;

/// A borrower's loan application, owned by the finance agency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplicationRecord {
    pub id: LinearId,
    #[serde(flatten)]
    pub terms: LoanTerms,
    pub status: LoanApplicationStatus,
    pub credit_check_id: Option<LinearId>,
    pub bank_processing_id: Option<LinearId>,
}

impl LoanApplicationRecord {
    /// Field holding the status on the ledger.
    pub const STATUS_FIELD: &'static str = "status";

    /// A freshly applied loan with a new id.
    pub fn new(terms: LoanTerms) -> Self {
        Self {
            id: LinearId::new(),
            terms,
            status: LoanApplicationStatus::Applied,
            credit_check_id: None,
            bank_processing_id: None,
        }
    }

    /// Next version: handed to the credit agency under `credit_check_id`.
    pub fn forwarded_to_credit_check(&self, credit_check_id: LinearId) -> Self {
        Self {
            status: LoanApplicationStatus::ForwardedToCreditCheckAgency,
            credit_check_id: Some(credit_check_id),
            ..self.clone()
        }
    }

    /// Next version: credit check finished with `status`.
    pub fn with_credit_result(&self, status: LoanApplicationStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Next version: handed to the bank under `bank_processing_id`.
    pub fn forwarded_to_bank(&self, bank_processing_id: LinearId) -> Self {
        Self {
            status: LoanApplicationStatus::ForwardedToBank,
            bank_processing_id: Some(bank_processing_id),
            ..self.clone()
        }
    }

    /// Next version: bank decision recorded as `status`.
    pub fn with_bank_result(&self, status: LoanApplicationStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

impl LinearRecord for LoanApplicationRecord {
    const RECORD_TYPE: &'static str = "LoanApplication";

    fn linear_id(&self) -> LinearId {
        self.id
    }

    fn participants(&self) -> Vec<Party> {
        vec![Party::FinanceAgency]
    }
}

/// A credit check shared by the finance agency and the credit agency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCheckRecord {
    pub id: LinearId,
    pub loan_application_id: LinearId,
    #[serde(flatten)]
    pub terms: LoanTerms,
    /// 0.0 until scored.
    pub credit_score: f64,
    pub credit_score_desc: CreditScoreDesc,
}

impl CreditCheckRecord {
    pub const DESC_FIELD: &'static str = "credit_score_desc";
    pub const APPLICATION_FIELD: &'static str = "loan_application_id";

    /// An unscored credit check for `application`.
    pub fn for_application(id: LinearId, application: &LoanApplicationRecord) -> Self {
        Self {
            id,
            loan_application_id: application.id,
            terms: application.terms.clone(),
            credit_score: 0.0,
            credit_score_desc: CreditScoreDesc::Unspecified,
        }
    }

    /// Next version carrying the credit agency's score.
    pub fn scored(&self, credit_score: f64, credit_score_desc: CreditScoreDesc) -> Self {
        Self {
            credit_score,
            credit_score_desc,
            ..self.clone()
        }
    }
}

impl LinearRecord for CreditCheckRecord {
    const RECORD_TYPE: &'static str = "CreditCheck";

    fn linear_id(&self) -> LinearId {
        self.id
    }

    fn participants(&self) -> Vec<Party> {
        vec![Party::FinanceAgency, Party::CreditAgency]
    }
}

/// A bank processing request shared by the finance agency and the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankProcessingRecord {
    pub id: LinearId,
    pub loan_application_id: LinearId,
    #[serde(flatten)]
    pub terms: LoanTerms,
    pub credit_score_desc: CreditScoreDesc,
    pub processing_status: BankProcessingStatus,
}

impl BankProcessingRecord {
    pub const STATUS_FIELD: &'static str = "processing_status";
    pub const APPLICATION_FIELD: &'static str = "loan_application_id";

    /// A pending bank request for `application`, carrying the credit rating.
    pub fn for_application(
        id: LinearId,
        application: &LoanApplicationRecord,
        credit_score_desc: CreditScoreDesc,
    ) -> Self {
        Self {
            id,
            loan_application_id: application.id,
            terms: application.terms.clone(),
            credit_score_desc,
            processing_status: BankProcessingStatus::InProcessing,
        }
    }

    /// Next version carrying the bank's decision.
    pub fn decided(&self, processing_status: BankProcessingStatus) -> Self {
        Self {
            processing_status,
            ..self.clone()
        }
    }
}

impl LinearRecord for BankProcessingRecord {
    const RECORD_TYPE: &'static str = "BankProcessing";

    fn linear_id(&self) -> LinearId {
        self.id
    }

    fn participants(&self) -> Vec<Party> {
        vec![Party::FinanceAgency, Party::Bank]
    }
}

//! Loan state machines.

use serde::{Deserialize, Serialize};

/// The status of a loan application in its lifecycle.
///
/// State transitions:
/// ```text
/// Applied ──► ForwardedToCreditCheckAgency ──┬──► CreditScoreCheckPass ──► ForwardedToBank ──┬──► LoanDisbursed
///                                            │                                               └──► RejectedFromBank
///                                            └──► CreditScoreCheckFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanApplicationStatus {
    /// Submitted by the borrower, nothing decided yet.
    #[default]
    Applied,

    /// Waiting for the credit agency's score.
    ForwardedToCreditCheckAgency,

    /// Credit score good enough to ask the bank.
    CreditScoreCheckPass,

    /// Credit score too low (terminal state).
    CreditScoreCheckFailed,

    /// Waiting for the bank's decision.
    ForwardedToBank,

    /// The bank paid out the loan (terminal state).
    LoanDisbursed,

    /// The bank refused the loan (terminal state).
    RejectedFromBank,
}

impl LoanApplicationStatus {
    /// Returns the statuses reachable in one step from this one.
    pub fn successors(&self) -> &'static [LoanApplicationStatus] {
        use LoanApplicationStatus::*;
        match self {
            Applied => &[ForwardedToCreditCheckAgency],
            ForwardedToCreditCheckAgency => &[CreditScoreCheckPass, CreditScoreCheckFailed],
            CreditScoreCheckPass => &[ForwardedToBank],
            ForwardedToBank => &[LoanDisbursed, RejectedFromBank],
            CreditScoreCheckFailed | LoanDisbursed | RejectedFromBank => &[],
        }
    }

    /// Returns true if `next` directly follows this status.
    pub fn can_transition_to(&self, next: LoanApplicationStatus) -> bool {
        self.successors().contains(&next)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    /// Coarse status reported to borrowers.
    pub fn abstract_status(&self) -> AbstractStatus {
        match self {
            LoanApplicationStatus::Applied => AbstractStatus::Applied,
            LoanApplicationStatus::ForwardedToCreditCheckAgency => AbstractStatus::DecisionPending,
            LoanApplicationStatus::CreditScoreCheckPass
            | LoanApplicationStatus::ForwardedToBank => AbstractStatus::Processing,
            LoanApplicationStatus::CreditScoreCheckFailed
            | LoanApplicationStatus::RejectedFromBank => AbstractStatus::Rejected,
            LoanApplicationStatus::LoanDisbursed => AbstractStatus::Processed,
        }
    }

    /// Returns the status name as it appears on the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanApplicationStatus::Applied => "APPLIED",
            LoanApplicationStatus::ForwardedToCreditCheckAgency => {
                "FORWARDED_TO_CREDIT_CHECK_AGENCY"
            }
            LoanApplicationStatus::CreditScoreCheckPass => "CREDIT_SCORE_CHECK_PASS",
            LoanApplicationStatus::CreditScoreCheckFailed => "CREDIT_SCORE_CHECK_FAILED",
            LoanApplicationStatus::ForwardedToBank => "FORWARDED_TO_BANK",
            LoanApplicationStatus::LoanDisbursed => "LOAN_DISBURSED",
            LoanApplicationStatus::RejectedFromBank => "REJECTED_FROM_BANK",
        }
    }
}

impl std::fmt::Display for LoanApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Borrower-facing summary of [`LoanApplicationStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbstractStatus {
    Applied,
    DecisionPending,
    Processing,
    Rejected,
    Processed,
}

impl AbstractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbstractStatus::Applied => "APPLIED",
            AbstractStatus::DecisionPending => "DECISION_PENDING",
            AbstractStatus::Processing => "PROCESSING",
            AbstractStatus::Rejected => "REJECTED",
            AbstractStatus::Processed => "PROCESSED",
        }
    }
}

impl std::fmt::Display for AbstractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Credit agency's classification of a credit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditScoreDesc {
    /// Not scored yet.
    #[default]
    Unspecified,
    Poor,
    Fair,
    Good,
}

impl CreditScoreDesc {
    /// Scores above 7.5 are good, above 5.0 fair, anything else poor.
    pub fn from_score(score: f64) -> Self {
        if score > 7.5 {
            CreditScoreDesc::Good
        } else if score > 5.0 {
            CreditScoreDesc::Fair
        } else {
            CreditScoreDesc::Poor
        }
    }

    /// Returns true once the credit agency has classified the score.
    pub fn is_scored(&self) -> bool {
        !matches!(self, CreditScoreDesc::Unspecified)
    }

    /// Returns true if the score is good enough to forward the loan to the bank.
    pub fn passes_credit_check(&self) -> bool {
        matches!(self, CreditScoreDesc::Good | CreditScoreDesc::Fair)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CreditScoreDesc::Unspecified => "UNSPECIFIED",
            CreditScoreDesc::Poor => "POOR",
            CreditScoreDesc::Fair => "FAIR",
            CreditScoreDesc::Good => "GOOD",
        }
    }
}

impl std::fmt::Display for CreditScoreDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The bank's processing status of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankProcessingStatus {
    #[default]
    InProcessing,

    /// Loan disbursed (terminal state).
    Processed,

    /// Loan refused (terminal state).
    Rejected,
}

impl BankProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BankProcessingStatus::InProcessing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BankProcessingStatus::InProcessing => "IN_PROCESSING",
            BankProcessingStatus::Processed => "PROCESSED",
            BankProcessingStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for BankProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The bank's disbursement rule: a poor credit rating is refused, anything
/// else is paid out. An unscored rating is never paid out.
pub fn disbursement_decision(desc: CreditScoreDesc) -> BankProcessingStatus {
    match desc {
        CreditScoreDesc::Fair | CreditScoreDesc::Good => BankProcessingStatus::Processed,
        CreditScoreDesc::Poor | CreditScoreDesc::Unspecified => BankProcessingStatus::Rejected,
    }
}

/// The application status that records a finished credit check.
pub fn credit_outcome(desc: CreditScoreDesc) -> LoanApplicationStatus {
    if desc.passes_credit_check() {
        LoanApplicationStatus::CreditScoreCheckPass
    } else {
        LoanApplicationStatus::CreditScoreCheckFailed
    }
}

/// The application status that records a finished bank decision, if the bank has decided.
pub fn bank_outcome(status: BankProcessingStatus) -> Option<LoanApplicationStatus> {
    match status {
        BankProcessingStatus::InProcessing => None,
        BankProcessingStatus::Processed => Some(LoanApplicationStatus::LoanDisbursed),
        BankProcessingStatus::Rejected => Some(LoanApplicationStatus::RejectedFromBank),
    }
}

//! Read-only view of one loan's progress through the saga.

use domain::{
    AbstractStatus, BankProcessingRecord, BankProcessingStatus, CreditCheckRecord,
    CreditScoreDesc, LoanApplicationRecord, LoanApplicationStatus, Versioned,
};

use crate::state::SagaStep;

/// An application joined with its linked credit check and bank request.
#[derive(Debug, Clone)]
pub struct SagaProgress {
    pub application: Versioned<LoanApplicationRecord>,
    pub credit_check: Option<Versioned<CreditCheckRecord>>,
    pub bank_processing: Option<Versioned<BankProcessingRecord>>,
}

impl SagaProgress {
    pub fn status(&self) -> LoanApplicationStatus {
        self.application.record.status
    }

    pub fn abstract_status(&self) -> AbstractStatus {
        self.status().abstract_status()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// The step that moves this loan forward, or `None` once it is settled.
    pub fn next_step(&self) -> Option<SagaStep> {
        match self.status() {
            LoanApplicationStatus::Applied => Some(SagaStep::ForwardToCreditCheck),
            LoanApplicationStatus::ForwardedToCreditCheckAgency => match &self.credit_check {
                None => Some(SagaStep::InitiateCreditCheck),
                Some(check) if check.record.credit_score_desc == CreditScoreDesc::Unspecified => {
                    Some(SagaStep::ScoreCreditCheck)
                }
                Some(_) => Some(SagaStep::RecordCreditResult),
            },
            LoanApplicationStatus::CreditScoreCheckPass => Some(SagaStep::ForwardToBank),
            LoanApplicationStatus::ForwardedToBank => match &self.bank_processing {
                None => Some(SagaStep::InitiateBankProcessing),
                Some(request)
                    if request.record.processing_status == BankProcessingStatus::InProcessing =>
                {
                    Some(SagaStep::DecideBankProcessing)
                }
                Some(_) => Some(SagaStep::RecordBankResult),
            },
            LoanApplicationStatus::CreditScoreCheckFailed
            | LoanApplicationStatus::LoanDisbursed
            | LoanApplicationStatus::RejectedFromBank => None,
        }
    }
}

impl std::fmt::Display for SagaProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.application.record.id,
            self.status(),
            self.abstract_status()
        )?;
        if let Some(step) = self.next_step() {
            write!(f, " next: {step} by {}", step.owner())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{LinearId, Party};
    use domain::LoanTerms;
    use ledger::{StateRef, TxId, Version};

    use super::*;

    fn versioned<R>(record: R) -> Versioned<R> {
        Versioned {
            record,
            state_ref: StateRef::new(TxId::new(), 0),
            version: Version::first(),
            committed_at: Utc::now(),
            consumed: false,
        }
    }

    fn progress(status: LoanApplicationStatus) -> SagaProgress {
        let record = LoanApplicationRecord {
            status,
            ..LoanApplicationRecord::new(LoanTerms::new("Acme", "Retail", 1_000))
        };
        SagaProgress {
            application: versioned(record),
            credit_check: None,
            bank_processing: None,
        }
    }

    #[test]
    fn test_new_application_is_forwarded_by_finance_agency() {
        let p = progress(LoanApplicationStatus::Applied);
        assert_eq!(p.next_step(), Some(SagaStep::ForwardToCreditCheck));
        assert_eq!(p.abstract_status(), AbstractStatus::Applied);
        assert!(!p.is_terminal());
    }

    #[test]
    fn test_credit_stage_next_steps() {
        let mut p = progress(LoanApplicationStatus::ForwardedToCreditCheckAgency);
        assert_eq!(p.next_step(), Some(SagaStep::InitiateCreditCheck));

        let check = CreditCheckRecord::for_application(LinearId::new(), &p.application.record);
        p.credit_check = Some(versioned(check.clone()));
        assert_eq!(p.next_step(), Some(SagaStep::ScoreCreditCheck));
        assert_eq!(p.next_step().map(|s| s.owner()), Some(Party::CreditAgency));

        p.credit_check = Some(versioned(check.scored(9.0, CreditScoreDesc::Good)));
        assert_eq!(p.next_step(), Some(SagaStep::RecordCreditResult));
    }

    #[test]
    fn test_bank_stage_next_steps() {
        let mut p = progress(LoanApplicationStatus::ForwardedToBank);
        assert_eq!(p.next_step(), Some(SagaStep::InitiateBankProcessing));

        let request = BankProcessingRecord::for_application(
            LinearId::new(),
            &p.application.record,
            CreditScoreDesc::Good,
        );
        p.bank_processing = Some(versioned(request.clone()));
        assert_eq!(p.next_step().map(|s| s.owner()), Some(Party::Bank));

        p.bank_processing = Some(versioned(request.decided(BankProcessingStatus::Processed)));
        assert_eq!(p.next_step(), Some(SagaStep::RecordBankResult));
        assert_eq!(p.abstract_status(), AbstractStatus::Processing);
    }

    #[test]
    fn test_terminal_states_have_no_next_step() {
        for status in [
            LoanApplicationStatus::CreditScoreCheckFailed,
            LoanApplicationStatus::LoanDisbursed,
            LoanApplicationStatus::RejectedFromBank,
        ] {
            let p = progress(status);
            assert!(p.is_terminal());
            assert_eq!(p.next_step(), None);
        }
        assert_eq!(
            progress(LoanApplicationStatus::LoanDisbursed).abstract_status(),
            AbstractStatus::Processed
        );
    }
}

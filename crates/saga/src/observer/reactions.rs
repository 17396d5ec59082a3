//! The five reactions that make up the loan saga.

use std::time::Duration;

use async_trait::async_trait;
use common::Party;
use domain::{BankProcessingRecord, CreditCheckRecord, LinearRecord, LoanApplicationRecord};
use ledger::{Ledger, StateEnvelope};

use super::Reaction;
use crate::error::{FlowError, Result};
use crate::flows::{BankFlows, CreditAgencyFlows, FinanceAgencyFlows};
use crate::state::SagaStep;

/// Finance agency: moves new applications to the credit agency and passed
/// applications to the bank, issuing the linked record right after.
pub struct ApplicationProgress<L> {
    finance: FinanceAgencyFlows<L>,
}

impl<L> ApplicationProgress<L> {
    pub fn new(finance: FinanceAgencyFlows<L>) -> Self {
        Self { finance }
    }
}

#[async_trait]
impl<L: Ledger + Clone + 'static> Reaction for ApplicationProgress<L> {
    fn name(&self) -> &'static str {
        "application_progress"
    }

    fn party(&self) -> Party {
        Party::FinanceAgency
    }

    fn record_type(&self) -> &'static str {
        LoanApplicationRecord::RECORD_TYPE
    }

    fn steps(&self) -> &'static [SagaStep] {
        &[SagaStep::ForwardToCreditCheck, SagaStep::ForwardToBank]
    }

    async fn react(&self, step: SagaStep, state: &StateEnvelope) -> Result<()> {
        let loan_id = state.linear_id;
        match step {
            SagaStep::ForwardToCreditCheck => {
                self.finance.forward_to_credit_check(loan_id).await?;
                self.finance.initiate_credit_check(loan_id).await?;
            }
            SagaStep::ForwardToBank => {
                self.finance.forward_to_bank(loan_id).await?;
                self.finance.initiate_bank_processing(loan_id).await?;
            }
            step => {
                return Err(FlowError::StepNotHandled {
                    observer: self.name(),
                    step,
                });
            }
        }
        Ok(())
    }
}

/// Finance agency: copies scored credit checks onto their applications.
pub struct CreditResultRecorder<L> {
    finance: FinanceAgencyFlows<L>,
}

impl<L> CreditResultRecorder<L> {
    pub fn new(finance: FinanceAgencyFlows<L>) -> Self {
        Self { finance }
    }
}

#[async_trait]
impl<L: Ledger + Clone + 'static> Reaction for CreditResultRecorder<L> {
    fn name(&self) -> &'static str {
        "credit_result_recorder"
    }

    fn party(&self) -> Party {
        Party::FinanceAgency
    }

    fn record_type(&self) -> &'static str {
        CreditCheckRecord::RECORD_TYPE
    }

    fn steps(&self) -> &'static [SagaStep] {
        &[SagaStep::RecordCreditResult]
    }

    async fn react(&self, _step: SagaStep, state: &StateEnvelope) -> Result<()> {
        self.finance.record_credit_result(state.linear_id).await?;
        Ok(())
    }
}

/// Finance agency: copies decided bank requests onto their applications.
pub struct BankResultRecorder<L> {
    finance: FinanceAgencyFlows<L>,
}

impl<L> BankResultRecorder<L> {
    pub fn new(finance: FinanceAgencyFlows<L>) -> Self {
        Self { finance }
    }
}

#[async_trait]
impl<L: Ledger + Clone + 'static> Reaction for BankResultRecorder<L> {
    fn name(&self) -> &'static str {
        "bank_result_recorder"
    }

    fn party(&self) -> Party {
        Party::FinanceAgency
    }

    fn record_type(&self) -> &'static str {
        BankProcessingRecord::RECORD_TYPE
    }

    fn steps(&self) -> &'static [SagaStep] {
        &[SagaStep::RecordBankResult]
    }

    async fn react(&self, _step: SagaStep, state: &StateEnvelope) -> Result<()> {
        self.finance.record_bank_result(state.linear_id).await?;
        Ok(())
    }
}

/// Credit agency: scores new credit checks after a processing delay.
pub struct CreditScoring<L> {
    credit: CreditAgencyFlows<L>,
    delay: Duration,
}

impl<L> CreditScoring<L> {
    pub fn new(credit: CreditAgencyFlows<L>, delay: Duration) -> Self {
        Self { credit, delay }
    }
}

#[async_trait]
impl<L: Ledger + Clone + 'static> Reaction for CreditScoring<L> {
    fn name(&self) -> &'static str {
        "credit_scoring"
    }

    fn party(&self) -> Party {
        Party::CreditAgency
    }

    fn record_type(&self) -> &'static str {
        CreditCheckRecord::RECORD_TYPE
    }

    fn steps(&self) -> &'static [SagaStep] {
        &[SagaStep::ScoreCreditCheck]
    }

    async fn react(&self, _step: SagaStep, state: &StateEnvelope) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.credit.score_credit_check(state.linear_id).await?;
        Ok(())
    }
}

/// Bank: decides new bank requests after a processing delay.
pub struct Disbursement<L> {
    bank: BankFlows<L>,
    delay: Duration,
}

impl<L> Disbursement<L> {
    pub fn new(bank: BankFlows<L>, delay: Duration) -> Self {
        Self { bank, delay }
    }
}

#[async_trait]
impl<L: Ledger + Clone + 'static> Reaction for Disbursement<L> {
    fn name(&self) -> &'static str {
        "disbursement"
    }

    fn party(&self) -> Party {
        Party::Bank
    }

    fn record_type(&self) -> &'static str {
        BankProcessingRecord::RECORD_TYPE
    }

    fn steps(&self) -> &'static [SagaStep] {
        &[SagaStep::DecideBankProcessing]
    }

    async fn react(&self, _step: SagaStep, state: &StateEnvelope) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.bank.post_bank_result(state.linear_id).await?;
        Ok(())
    }
}

//! Finance agency flows. The finance agency owns the application and drives
//! the saga from one step to the next.

use common::{LinearId, Party};
use domain::{
    BankProcessingRecord, CreditCheckRecord, LinearRecord, LoanApplicationRecord,
    LoanApplicationStatus, LoanCommand, LoanTerms, Versioned, bank_outcome, credit_outcome,
};
use ledger::Ledger;

use super::{FlowContext, measured};
use crate::error::{FlowError, Result};
use crate::status::SagaProgress;

/// Flows run by the finance agency.
#[derive(Clone)]
pub struct FinanceAgencyFlows<L> {
    ctx: FlowContext<L>,
}

impl<L: Ledger + Clone> FinanceAgencyFlows<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ctx: FlowContext::new(ledger, Party::FinanceAgency),
        }
    }

    pub fn context(&self) -> &FlowContext<L> {
        &self.ctx
    }

    /// Issues a new application in `APPLIED`.
    #[tracing::instrument(skip(self))]
    pub async fn create_application(
        &self,
        company_name: &str,
        business_type: &str,
        loan_amount: i64,
    ) -> Result<Versioned<LoanApplicationRecord>> {
        measured("create_application", async {
            let application =
                LoanApplicationRecord::new(LoanTerms::new(company_name, business_type, loan_amount));
            let committed = self
                .ctx
                .submit(LoanCommand::ApplyForLoan, None, &application)
                .await?;
            tracing::info!(loan_id = %committed.record.id, "loan application created");
            Ok(committed)
        })
        .await
    }

    /// Moves an `APPLIED` application to the credit agency and assigns the id
    /// its credit check will be issued under.
    #[tracing::instrument(skip(self))]
    pub async fn forward_to_credit_check(
        &self,
        loan_id: LinearId,
    ) -> Result<Versioned<LoanApplicationRecord>> {
        measured("forward_to_credit_check", async {
            let current = self
                .ctx
                .resolve(loan_id, "in APPLIED", |app: &LoanApplicationRecord| {
                    app.status == LoanApplicationStatus::Applied && app.credit_check_id.is_none()
                })
                .await?;
            let credit_check_id = LinearId::new();
            let next = current.record.forwarded_to_credit_check(credit_check_id);
            let committed = self
                .ctx
                .submit(
                    LoanCommand::ForwardToCreditCheck { credit_check_id },
                    Some(&current),
                    &next,
                )
                .await?;
            tracing::info!(%loan_id, %credit_check_id, "forwarded to credit agency");
            Ok(committed)
        })
        .await
    }

    /// Issues the credit check an application was forwarded with.
    ///
    /// The credit check takes the id assigned when forwarding, so a second
    /// initiation for the same application collides on that id.
    #[tracing::instrument(skip(self))]
    pub async fn initiate_credit_check(
        &self,
        loan_id: LinearId,
    ) -> Result<Versioned<CreditCheckRecord>> {
        measured("initiate_credit_check", async {
            let application = self
                .ctx
                .resolve(
                    loan_id,
                    "in FORWARDED_TO_CREDIT_CHECK_AGENCY",
                    |app: &LoanApplicationRecord| {
                        app.status == LoanApplicationStatus::ForwardedToCreditCheckAgency
                    },
                )
                .await?;
            let credit_check_id = application.record.credit_check_id.ok_or_else(|| {
                FlowError::not_found(
                    LoanApplicationRecord::RECORD_TYPE,
                    loan_id,
                    "no credit check assigned",
                )
            })?;
            let check = CreditCheckRecord::for_application(credit_check_id, &application.record);
            let committed = self
                .ctx
                .submit::<CreditCheckRecord>(LoanCommand::InitiateCreditCheck, None, &check)
                .await?;
            tracing::info!(%loan_id, %credit_check_id, "credit check initiated");
            Ok(committed)
        })
        .await
    }

    /// Copies a scored credit check onto its application.
    #[tracing::instrument(skip(self))]
    pub async fn record_credit_result(
        &self,
        credit_check_id: LinearId,
    ) -> Result<Versioned<LoanApplicationRecord>> {
        measured("record_credit_result", async {
            let check = self
                .ctx
                .resolve(credit_check_id, "that is scored", |check: &CreditCheckRecord| {
                    check.credit_score_desc.is_scored()
                })
                .await?;
            let loan_id = check.record.loan_application_id;
            let application = self
                .ctx
                .resolve(
                    loan_id,
                    "awaiting this credit result",
                    |app: &LoanApplicationRecord| {
                        app.status == LoanApplicationStatus::ForwardedToCreditCheckAgency
                            && app.credit_check_id == Some(credit_check_id)
                    },
                )
                .await?;

            let desc = check.record.credit_score_desc;
            let next = application.record.with_credit_result(credit_outcome(desc));
            let committed = self
                .ctx
                .submit_referencing(
                    LoanCommand::RecordCreditResult {
                        credit_check_id,
                        credit_score_desc: desc,
                    },
                    Some(&application),
                    &[check.state_ref],
                    &next,
                )
                .await?;
            tracing::info!(%loan_id, credit_score_desc = %desc, status = %next.status, "credit result recorded");
            Ok(committed)
        })
        .await
    }

    /// Moves an application that passed its credit check to the bank.
    #[tracing::instrument(skip(self))]
    pub async fn forward_to_bank(&self, loan_id: LinearId) -> Result<Versioned<LoanApplicationRecord>> {
        measured("forward_to_bank", async {
            let current = self
                .ctx
                .resolve(
                    loan_id,
                    "in CREDIT_SCORE_CHECK_PASS",
                    |app: &LoanApplicationRecord| {
                        app.status == LoanApplicationStatus::CreditScoreCheckPass
                            && app.bank_processing_id.is_none()
                    },
                )
                .await?;
            let bank_processing_id = LinearId::new();
            let next = current.record.forwarded_to_bank(bank_processing_id);
            let committed = self
                .ctx
                .submit(
                    LoanCommand::ForwardToBank { bank_processing_id },
                    Some(&current),
                    &next,
                )
                .await?;
            tracing::info!(%loan_id, %bank_processing_id, "forwarded to bank");
            Ok(committed)
        })
        .await
    }

    /// Issues the bank request an application was forwarded with, carrying
    /// the rating from its credit check.
    #[tracing::instrument(skip(self))]
    pub async fn initiate_bank_processing(
        &self,
        loan_id: LinearId,
    ) -> Result<Versioned<BankProcessingRecord>> {
        measured("initiate_bank_processing", async {
            let application = self
                .ctx
                .resolve(loan_id, "in FORWARDED_TO_BANK", |app: &LoanApplicationRecord| {
                    app.status == LoanApplicationStatus::ForwardedToBank
                })
                .await?;
            let (Some(bank_processing_id), Some(credit_check_id)) = (
                application.record.bank_processing_id,
                application.record.credit_check_id,
            ) else {
                return Err(FlowError::not_found(
                    LoanApplicationRecord::RECORD_TYPE,
                    loan_id,
                    "no bank request or credit check assigned",
                ));
            };
            let check = self
                .ctx
                .resolve(credit_check_id, "that is scored", |check: &CreditCheckRecord| {
                    check.credit_score_desc.is_scored()
                })
                .await?;

            let request = BankProcessingRecord::for_application(
                bank_processing_id,
                &application.record,
                check.record.credit_score_desc,
            );
            let committed = self
                .ctx
                .submit::<BankProcessingRecord>(LoanCommand::InitiateBankProcessing, None, &request)
                .await?;
            tracing::info!(%loan_id, %bank_processing_id, "bank processing initiated");
            Ok(committed)
        })
        .await
    }

    /// Copies a decided bank request onto its application.
    #[tracing::instrument(skip(self))]
    pub async fn record_bank_result(
        &self,
        bank_processing_id: LinearId,
    ) -> Result<Versioned<LoanApplicationRecord>> {
        measured("record_bank_result", async {
            let request = self
                .ctx
                .resolve(bank_processing_id, "that is decided", |req: &BankProcessingRecord| {
                    req.processing_status.is_terminal()
                })
                .await?;
            let processing_status = request.record.processing_status;
            let outcome = bank_outcome(processing_status).ok_or_else(|| {
                FlowError::not_found(
                    BankProcessingRecord::RECORD_TYPE,
                    bank_processing_id,
                    "bank request is not decided",
                )
            })?;
            let loan_id = request.record.loan_application_id;
            let application = self
                .ctx
                .resolve(
                    loan_id,
                    "awaiting this bank result",
                    |app: &LoanApplicationRecord| {
                        app.status == LoanApplicationStatus::ForwardedToBank
                            && app.bank_processing_id == Some(bank_processing_id)
                    },
                )
                .await?;

            let next = application.record.with_bank_result(outcome);
            let committed = self
                .ctx
                .submit_referencing(
                    LoanCommand::RecordBankResult {
                        bank_processing_id,
                        processing_status,
                    },
                    Some(&application),
                    &[request.state_ref],
                    &next,
                )
                .await?;
            tracing::info!(%loan_id, status = %outcome, "bank result recorded");
            Ok(committed)
        })
        .await
    }

    /// Returns the current version of an application.
    pub async fn application(
        &self,
        loan_id: LinearId,
    ) -> Result<Option<Versioned<LoanApplicationRecord>>> {
        self.ctx.current(loan_id).await
    }

    pub async fn applications(&self) -> Result<Vec<Versioned<LoanApplicationRecord>>> {
        self.ctx.list().await
    }

    pub async fn credit_checks(&self) -> Result<Vec<Versioned<CreditCheckRecord>>> {
        self.ctx.list().await
    }

    pub async fn bank_requests(&self) -> Result<Vec<Versioned<BankProcessingRecord>>> {
        self.ctx.list().await
    }

    /// Every version of an application, oldest first.
    pub async fn application_history(
        &self,
        loan_id: LinearId,
    ) -> Result<Vec<Versioned<LoanApplicationRecord>>> {
        self.ctx.history(loan_id).await
    }

    /// Joins an application with its linked credit check and bank request.
    pub async fn progress(&self, loan_id: LinearId) -> Result<Option<SagaProgress>> {
        let Some(application) = self.application(loan_id).await? else {
            return Ok(None);
        };
        let credit_check = match application.record.credit_check_id {
            Some(id) => self.ctx.current::<CreditCheckRecord>(id).await?,
            None => None,
        };
        let bank_processing = match application.record.bank_processing_id {
            Some(id) => self.ctx.current::<BankProcessingRecord>(id).await?,
            None => None,
        };
        Ok(Some(SagaProgress {
            application,
            credit_check,
            bank_processing,
        }))
    }
}

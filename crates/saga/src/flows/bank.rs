//! Bank flows.

use common::{LinearId, Party};
use domain::{
    BankProcessingRecord, BankProcessingStatus, LoanCommand, Versioned, disbursement_decision,
};
use ledger::Ledger;

use super::{FlowContext, measured};
use crate::error::Result;

/// Flows run by the bank.
#[derive(Clone)]
pub struct BankFlows<L> {
    ctx: FlowContext<L>,
}

impl<L: Ledger + Clone> BankFlows<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ctx: FlowContext::new(ledger, Party::Bank),
        }
    }

    pub fn context(&self) -> &FlowContext<L> {
        &self.ctx
    }

    /// Decides a pending bank request from the rating it carries.
    #[tracing::instrument(skip(self))]
    pub async fn post_bank_result(
        &self,
        bank_processing_id: LinearId,
    ) -> Result<Versioned<BankProcessingRecord>> {
        measured("post_bank_result", async {
            let current = self
                .ctx
                .resolve(
                    bank_processing_id,
                    "in IN_PROCESSING",
                    |req: &BankProcessingRecord| {
                        req.processing_status == BankProcessingStatus::InProcessing
                    },
                )
                .await?;
            let decision = disbursement_decision(current.record.credit_score_desc);
            let next = current.record.decided(decision);
            let committed = self
                .ctx
                .submit(LoanCommand::PostBankResult, Some(&current), &next)
                .await?;
            tracing::info!(
                %bank_processing_id,
                credit_score_desc = %current.record.credit_score_desc,
                processing_status = %decision,
                "bank request decided"
            );
            Ok(committed)
        })
        .await
    }

    pub async fn bank_requests(&self) -> Result<Vec<Versioned<BankProcessingRecord>>> {
        self.ctx.list().await
    }

    /// Returns the current bank request issued for an application.
    pub async fn bank_request_for_application(
        &self,
        loan_id: LinearId,
    ) -> Result<Option<Versioned<BankProcessingRecord>>> {
        self.ctx
            .find_by_field(BankProcessingRecord::APPLICATION_FIELD, loan_id.to_string())
            .await
    }
}

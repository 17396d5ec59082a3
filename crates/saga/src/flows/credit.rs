//! Credit agency flows.

use std::sync::Arc;

use common::{LinearId, Party};
use domain::{CreditCheckRecord, CreditScoreDesc, LoanCommand, Versioned};
use ledger::Ledger;

use super::{FlowContext, measured};
use crate::error::Result;
use crate::services::CreditScorer;

/// Flows run by the credit agency.
#[derive(Clone)]
pub struct CreditAgencyFlows<L> {
    ctx: FlowContext<L>,
    scorer: Arc<dyn CreditScorer>,
}

impl<L: Ledger + Clone> CreditAgencyFlows<L> {
    pub fn new(ledger: L, scorer: Arc<dyn CreditScorer>) -> Self {
        Self {
            ctx: FlowContext::new(ledger, Party::CreditAgency),
            scorer,
        }
    }

    pub fn context(&self) -> &FlowContext<L> {
        &self.ctx
    }

    /// Posts a score onto a pending credit check.
    #[tracing::instrument(skip(self))]
    pub async fn post_credit_check_result(
        &self,
        credit_check_id: LinearId,
        credit_score: f64,
        credit_score_desc: CreditScoreDesc,
    ) -> Result<Versioned<CreditCheckRecord>> {
        measured("post_credit_check_result", async {
            let current = self.pending(credit_check_id).await?;
            let next = current.record.scored(credit_score, credit_score_desc);
            let committed = self
                .ctx
                .submit(LoanCommand::PostCreditCheckResult, Some(&current), &next)
                .await?;
            tracing::info!(
                %credit_check_id,
                credit_score,
                credit_score_desc = %credit_score_desc,
                "credit check scored"
            );
            Ok(committed)
        })
        .await
    }

    /// Asks the scorer for a decision on a pending check and posts it.
    #[tracing::instrument(skip(self))]
    pub async fn score_credit_check(
        &self,
        credit_check_id: LinearId,
    ) -> Result<Versioned<CreditCheckRecord>> {
        let current = self.pending(credit_check_id).await?;
        let score = self.scorer.score(&current.record).await?;
        self.post_credit_check_result(credit_check_id, score.score, score.desc)
            .await
    }

    pub async fn credit_checks(&self) -> Result<Vec<Versioned<CreditCheckRecord>>> {
        self.ctx.list().await
    }

    /// Returns the current credit check issued for an application.
    pub async fn credit_check_for_application(
        &self,
        loan_id: LinearId,
    ) -> Result<Option<Versioned<CreditCheckRecord>>> {
        self.ctx
            .find_by_field(CreditCheckRecord::APPLICATION_FIELD, loan_id.to_string())
            .await
    }

    async fn pending(&self, credit_check_id: LinearId) -> Result<Versioned<CreditCheckRecord>> {
        self.ctx
            .resolve(credit_check_id, "awaiting a score", |check: &CreditCheckRecord| {
                check.credit_score_desc == CreditScoreDesc::Unspecified
            })
            .await
    }
}

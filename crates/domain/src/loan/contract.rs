//! Transition rules of the loan contract.
//!
//! Every signer runs [`LoanContract::verify`] on a transaction before signing
//! it. The command carried by the transaction selects one pure rule function;
//! any broken rule rejects the whole transaction.

use std::collections::BTreeSet;

use common::{LinearId, Party};
use ledger::LedgerTransaction;

use super::{
    BankProcessingRecord, BankProcessingStatus, CreditCheckRecord, CreditScoreDesc, LoanCommand,
    LoanApplicationRecord, LoanApplicationStatus, LoanTerms, bank_outcome, credit_outcome,
    disbursement_decision,
};
use crate::error::ValidationError;
use crate::record::LinearRecord;

/// A posted credit score must be strictly greater than this.
pub const MIN_CREDIT_SCORE: f64 = 0.1;

type Verdict = Result<(), ValidationError>;

/// The loan contract's verification entry point.
pub struct LoanContract;

impl LoanContract {
    /// Verifies a transaction against the rules of the command it carries.
    pub fn verify(tx: &LedgerTransaction) -> Verdict {
        let [envelope] = tx.commands.as_slice() else {
            return Err(ValidationError::new(
                "transaction",
                format!(
                    "exactly one command is required, found {}",
                    tx.commands.len()
                ),
            ));
        };
        let command = LoanCommand::from_envelope(envelope)?;

        let rules = Rules {
            command: command.command_type(),
            tx,
            signers: envelope.signers.iter().copied().collect(),
        };
        let expected: BTreeSet<Party> = command.signers().into_iter().collect();
        rules.require(rules.signers == expected, || {
            format!(
                "signers must be exactly {expected:?}, found {:?}",
                rules.signers
            )
        })?;
        let initiator = command.initiator();
        rules.require(tx.initiator == initiator, || {
            format!("must be started by {initiator}, found {}", tx.initiator)
        })?;
        let reads_reference = matches!(
            command,
            LoanCommand::RecordCreditResult { .. } | LoanCommand::RecordBankResult { .. }
        );
        rules.require(reads_reference || tx.references.is_empty(), || {
            format!("no reference states expected, found {}", tx.references.len())
        })?;

        match command {
            LoanCommand::ApplyForLoan => apply_for_loan(&rules),
            LoanCommand::ForwardToCreditCheck { credit_check_id } => {
                forward_to_credit_check(&rules, credit_check_id)
            }
            LoanCommand::InitiateCreditCheck => initiate_credit_check(&rules),
            LoanCommand::PostCreditCheckResult => post_credit_check_result(&rules),
            LoanCommand::RecordCreditResult {
                credit_check_id,
                credit_score_desc,
            } => record_credit_result(&rules, credit_check_id, credit_score_desc),
            LoanCommand::ForwardToBank { bank_processing_id } => {
                forward_to_bank(&rules, bank_processing_id)
            }
            LoanCommand::InitiateBankProcessing => initiate_bank_processing(&rules),
            LoanCommand::PostBankResult => post_bank_result(&rules),
            LoanCommand::RecordBankResult {
                bank_processing_id,
                processing_status,
            } => record_bank_result(&rules, bank_processing_id, processing_status),
        }
    }
}

struct Rules<'a> {
    command: &'static str,
    tx: &'a LedgerTransaction,
    signers: BTreeSet<Party>,
}

impl Rules<'_> {
    fn require(&self, condition: bool, reason: impl FnOnce() -> String) -> Verdict {
        if condition {
            Ok(())
        } else {
            Err(ValidationError::new(self.command, reason()))
        }
    }

    fn reject<T>(&self, reason: impl Into<String>) -> Result<T, ValidationError> {
        Err(ValidationError::new(self.command, reason))
    }

    /// The single output, decoded, with its participants signing.
    fn output<R: LinearRecord>(&self) -> Result<R, ValidationError> {
        let [state] = self.tx.outputs.as_slice() else {
            return self.reject(format!(
                "exactly one output is required, found {}",
                self.tx.outputs.len()
            ));
        };
        let record = R::from_state(state).map_err(|e| ValidationError::new(self.command, e.to_string()))?;

        let declared: BTreeSet<Party> = state.participants.iter().copied().collect();
        let owners: BTreeSet<Party> = record.participants().into_iter().collect();
        self.require(declared == owners, || {
            format!("output participants must be {owners:?}, found {declared:?}")
        })?;
        self.require(owners.is_subset(&self.signers), || {
            format!("every participant must sign, signers are {:?}", self.signers)
        })?;
        Ok(record)
    }

    /// The single consumed input, which must be an earlier version of `linear_id`.
    fn input<R: LinearRecord>(&self, linear_id: LinearId) -> Result<R, ValidationError> {
        let [state] = self.tx.inputs.as_slice() else {
            return self.reject(format!(
                "exactly one input is required, found {}",
                self.tx.inputs.len()
            ));
        };
        self.require(state.linear_id == linear_id, || {
            format!(
                "input {} and output {linear_id} are different records",
                state.linear_id
            )
        })?;
        R::from_state(state).map_err(|e| ValidationError::new(self.command, e.to_string()))
    }

    /// The single reference state, which must be the current version of `linear_id`.
    fn reference<R: LinearRecord>(&self, linear_id: LinearId) -> Result<R, ValidationError> {
        let [state] = self.tx.references.as_slice() else {
            return self.reject(format!(
                "exactly one reference is required, found {}",
                self.tx.references.len()
            ));
        };
        self.require(state.linear_id == linear_id, || {
            format!("reference {} is not {linear_id}", state.linear_id)
        })?;
        R::from_state(state).map_err(|e| ValidationError::new(self.command, e.to_string()))
    }

    fn no_inputs(&self) -> Verdict {
        self.require(self.tx.inputs.is_empty(), || {
            format!(
                "issuing a record consumes nothing, found {} inputs",
                self.tx.inputs.len()
            )
        })
    }

    fn valid_terms(&self, terms: &LoanTerms) -> Verdict {
        match terms.violation() {
            Some(reason) => self.reject(reason),
            None => Ok(()),
        }
    }

    fn unchanged_terms(&self, before: &LoanTerms, after: &LoanTerms) -> Verdict {
        self.require(before == after, || {
            "company, business type and amount must not change".to_string()
        })?;
        self.valid_terms(after)
    }

    /// Common rules of every application supersession.
    fn application_step(
        &self,
        input: &LoanApplicationRecord,
        output: &LoanApplicationRecord,
        from: LoanApplicationStatus,
        to: LoanApplicationStatus,
    ) -> Verdict {
        self.require(input.status == from, || {
            format!("application must be {from}, found {}", input.status)
        })?;
        self.require(output.status == to, || {
            format!("application must become {to}, found {}", output.status)
        })?;
        self.require(from.can_transition_to(to), || {
            format!("{from} cannot move to {to}")
        })?;
        self.unchanged_terms(&input.terms, &output.terms)
    }
}

fn apply_for_loan(rules: &Rules<'_>) -> Verdict {
    rules.no_inputs()?;
    let application: LoanApplicationRecord = rules.output()?;
    rules.require(application.status == LoanApplicationStatus::Applied, || {
        format!("new application must be APPLIED, found {}", application.status)
    })?;
    rules.require(
        application.credit_check_id.is_none() && application.bank_processing_id.is_none(),
        || "new application must not be linked yet".to_string(),
    )?;
    rules.valid_terms(&application.terms)
}

fn forward_to_credit_check(rules: &Rules<'_>, credit_check_id: LinearId) -> Verdict {
    let output: LoanApplicationRecord = rules.output()?;
    let input: LoanApplicationRecord = rules.input(output.id)?;
    rules.application_step(
        &input,
        &output,
        LoanApplicationStatus::Applied,
        LoanApplicationStatus::ForwardedToCreditCheckAgency,
    )?;
    rules.require(input.credit_check_id.is_none(), || {
        "credit check already assigned".to_string()
    })?;
    rules.require(output.credit_check_id == Some(credit_check_id), || {
        format!("credit_check_id must be the newly assigned {credit_check_id}")
    })?;
    rules.require(output.bank_processing_id.is_none(), || {
        "bank processing id must not be set".to_string()
    })
}

fn initiate_credit_check(rules: &Rules<'_>) -> Verdict {
    rules.no_inputs()?;
    let check: CreditCheckRecord = rules.output()?;
    rules.require(check.credit_score == 0.0, || {
        format!("new credit check must be unscored, found {}", check.credit_score)
    })?;
    rules.require(
        check.credit_score_desc == CreditScoreDesc::Unspecified,
        || {
            format!(
                "new credit check must be UNSPECIFIED, found {}",
                check.credit_score_desc
            )
        },
    )?;
    rules.valid_terms(&check.terms)
}

fn post_credit_check_result(rules: &Rules<'_>) -> Verdict {
    let output: CreditCheckRecord = rules.output()?;
    let input: CreditCheckRecord = rules.input(output.id)?;
    rules.require(
        input.credit_score_desc == CreditScoreDesc::Unspecified && input.credit_score == 0.0,
        || format!("credit check already scored as {}", input.credit_score_desc),
    )?;
    rules.require(output.credit_score_desc.is_scored(), || {
        "result must be POOR, FAIR or GOOD".to_string()
    })?;
    rules.require(output.credit_score > MIN_CREDIT_SCORE, || {
        format!(
            "credit score must be greater than {MIN_CREDIT_SCORE}, found {}",
            output.credit_score
        )
    })?;
    let rating = CreditScoreDesc::from_score(output.credit_score);
    rules.require(output.credit_score_desc == rating, || {
        format!(
            "credit score {} is rated {rating}, not {}",
            output.credit_score, output.credit_score_desc
        )
    })?;
    rules.require(output.loan_application_id == input.loan_application_id, || {
        "loan application link must not change".to_string()
    })?;
    rules.unchanged_terms(&input.terms, &output.terms)
}

fn record_credit_result(
    rules: &Rules<'_>,
    credit_check_id: LinearId,
    desc: CreditScoreDesc,
) -> Verdict {
    rules.require(desc.is_scored(), || {
        "credit check has not been scored".to_string()
    })?;
    let output: LoanApplicationRecord = rules.output()?;
    let input: LoanApplicationRecord = rules.input(output.id)?;
    rules.application_step(
        &input,
        &output,
        LoanApplicationStatus::ForwardedToCreditCheckAgency,
        credit_outcome(desc),
    )?;
    rules.require(input.credit_check_id == Some(credit_check_id), || {
        format!("application is not linked to credit check {credit_check_id}")
    })?;
    let check: CreditCheckRecord = rules.reference(credit_check_id)?;
    rules.require(check.credit_score_desc == desc, || {
        format!(
            "credit check {credit_check_id} is rated {}, not {desc}",
            check.credit_score_desc
        )
    })?;
    rules.require(check.loan_application_id == output.id, || {
        format!("credit check {credit_check_id} belongs to another application")
    })?;
    rules.require(
        output.credit_check_id == input.credit_check_id
            && output.bank_processing_id == input.bank_processing_id,
        || "links must not change".to_string(),
    )
}

fn forward_to_bank(rules: &Rules<'_>, bank_processing_id: LinearId) -> Verdict {
    let output: LoanApplicationRecord = rules.output()?;
    let input: LoanApplicationRecord = rules.input(output.id)?;
    rules.application_step(
        &input,
        &output,
        LoanApplicationStatus::CreditScoreCheckPass,
        LoanApplicationStatus::ForwardedToBank,
    )?;
    rules.require(input.bank_processing_id.is_none(), || {
        "bank processing already assigned".to_string()
    })?;
    rules.require(output.bank_processing_id == Some(bank_processing_id), || {
        format!("bank_processing_id must be the newly assigned {bank_processing_id}")
    })?;
    rules.require(output.credit_check_id == input.credit_check_id, || {
        "credit check link must not change".to_string()
    })
}

fn initiate_bank_processing(rules: &Rules<'_>) -> Verdict {
    rules.no_inputs()?;
    let request: BankProcessingRecord = rules.output()?;
    rules.require(
        request.processing_status == BankProcessingStatus::InProcessing,
        || {
            format!(
                "new bank request must be IN_PROCESSING, found {}",
                request.processing_status
            )
        },
    )?;
    rules.require(request.credit_score_desc.is_scored(), || {
        "bank request needs a scored credit rating".to_string()
    })?;
    rules.valid_terms(&request.terms)
}

fn post_bank_result(rules: &Rules<'_>) -> Verdict {
    let output: BankProcessingRecord = rules.output()?;
    let input: BankProcessingRecord = rules.input(output.id)?;
    rules.require(
        input.processing_status == BankProcessingStatus::InProcessing,
        || format!("bank request already decided as {}", input.processing_status),
    )?;
    let decision = disbursement_decision(input.credit_score_desc);
    rules.require(output.processing_status == decision, || {
        format!(
            "a {} rating must be {decision}, found {}",
            input.credit_score_desc, output.processing_status
        )
    })?;
    rules.require(output.credit_score_desc == input.credit_score_desc, || {
        "credit rating must not change".to_string()
    })?;
    rules.require(output.loan_application_id == input.loan_application_id, || {
        "loan application link must not change".to_string()
    })?;
    rules.unchanged_terms(&input.terms, &output.terms)
}

fn record_bank_result(
    rules: &Rules<'_>,
    bank_processing_id: LinearId,
    status: BankProcessingStatus,
) -> Verdict {
    let Some(outcome) = bank_outcome(status) else {
        return rules.reject("bank has not decided yet");
    };
    let output: LoanApplicationRecord = rules.output()?;
    let input: LoanApplicationRecord = rules.input(output.id)?;
    rules.application_step(
        &input,
        &output,
        LoanApplicationStatus::ForwardedToBank,
        outcome,
    )?;
    rules.require(input.bank_processing_id == Some(bank_processing_id), || {
        format!("application is not linked to bank request {bank_processing_id}")
    })?;
    let request: BankProcessingRecord = rules.reference(bank_processing_id)?;
    rules.require(request.processing_status == status, || {
        format!(
            "bank request {bank_processing_id} is {}, not {status}",
            request.processing_status
        )
    })?;
    rules.require(request.loan_application_id == output.id, || {
        format!("bank request {bank_processing_id} belongs to another application")
    })?;
    rules.require(
        output.credit_check_id == input.credit_check_id
            && output.bank_processing_id == input.bank_processing_id,
        || "links must not change".to_string(),
    )
}

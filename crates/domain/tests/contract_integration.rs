//! The loan contract enforced through a real ledger submission.

use std::sync::Arc;

use common::{LinearId, Party};
use domain::{
    CreditCheckRecord, CreditScoreDesc, LinearRecord, LoanApplicationRecord,
    LoanApplicationStatus, LoanCommand, LoanTerms, PartyVerifier, Versioned,
};
use ledger::{InMemoryLedger, Ledger, LedgerError, LedgerExt, TransactionProposal};

async fn network() -> InMemoryLedger {
    let ledger = InMemoryLedger::default();
    for party in Party::ALL {
        ledger
            .register_party(party, Arc::new(PartyVerifier::new(party)))
            .await;
    }
    ledger
}

fn proposal<R: LinearRecord>(
    initiator: Party,
    command: LoanCommand,
    input: Option<&Versioned<R>>,
    output: &R,
) -> TransactionProposal {
    let mut proposal = TransactionProposal::new(initiator)
        .output(output.to_output().unwrap())
        .command(command.to_envelope().unwrap());
    if let Some(input) = input {
        proposal = proposal.input(input.state_ref);
    }
    proposal
}

async fn apply(ledger: &InMemoryLedger, terms: LoanTerms) -> Versioned<LoanApplicationRecord> {
    let app = LoanApplicationRecord::new(terms);
    let tx = ledger
        .submit(proposal(
            Party::FinanceAgency,
            LoanCommand::ApplyForLoan,
            None,
            &app,
        ))
        .await
        .unwrap();
    Versioned::from_state(&tx.outputs[0]).unwrap()
}

#[tokio::test]
async fn test_application_issued_and_forwarded() {
    let ledger = network().await;
    let applied = apply(&ledger, LoanTerms::new("Acme", "Retail", 10_000)).await;
    assert_eq!(applied.record.status, LoanApplicationStatus::Applied);

    let credit_check_id = LinearId::new();
    let next = applied.record.forwarded_to_credit_check(credit_check_id);
    let tx = ledger
        .submit(proposal(
            Party::FinanceAgency,
            LoanCommand::ForwardToCreditCheck { credit_check_id },
            Some(&applied),
            &next,
        ))
        .await
        .unwrap();
    assert!(tx.is_signed_by(Party::FinanceAgency));

    let current = ledger.current(applied.record.id).await.unwrap().unwrap();
    let current = LoanApplicationRecord::from_state(&current).unwrap();
    assert_eq!(
        current.status,
        LoanApplicationStatus::ForwardedToCreditCheckAgency
    );
    assert_eq!(current.credit_check_id, Some(credit_check_id));
}

#[tokio::test]
async fn test_invalid_terms_never_committed() {
    let ledger = network().await;
    let app = LoanApplicationRecord::new(LoanTerms::new("Acme", "Retail", 0));
    let err = ledger
        .submit(proposal(
            Party::FinanceAgency,
            LoanCommand::ApplyForLoan,
            None,
            &app,
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::ValidationRejected {
            party: Party::FinanceAgency,
            ..
        }
    ));
    assert_eq!(ledger.state_count().await, 0);
}

#[tokio::test]
async fn test_credit_check_cosigned_by_credit_agency() {
    let ledger = network().await;
    let applied = apply(&ledger, LoanTerms::new("Acme", "Retail", 10_000)).await;
    let check = CreditCheckRecord::for_application(LinearId::new(), &applied.record);

    let tx = ledger
        .submit(proposal(
            Party::FinanceAgency,
            LoanCommand::InitiateCreditCheck,
            None,
            &check,
        ))
        .await
        .unwrap();
    assert!(tx.is_signed_by(Party::FinanceAgency));
    assert!(tx.is_signed_by(Party::CreditAgency));
    assert!(!tx.is_signed_by(Party::Bank));

    let pending: Versioned<CreditCheckRecord> = Versioned::from_state(&tx.outputs[0]).unwrap();
    let scored = pending.record.scored(8.0, CreditScoreDesc::Good);
    let tx = ledger
        .submit(proposal(
            Party::CreditAgency,
            LoanCommand::PostCreditCheckResult,
            Some(&pending),
            &scored,
        ))
        .await
        .unwrap();
    assert_eq!(tx.initiator, Party::CreditAgency);
    assert_eq!(ledger.history(check.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_counterparty_rejects_low_score() {
    let ledger = network().await;
    let applied = apply(&ledger, LoanTerms::new("Acme", "Retail", 10_000)).await;
    let check = CreditCheckRecord::for_application(LinearId::new(), &applied.record);
    let tx = ledger
        .submit(proposal(
            Party::FinanceAgency,
            LoanCommand::InitiateCreditCheck,
            None,
            &check,
        ))
        .await
        .unwrap();
    let pending: Versioned<CreditCheckRecord> = Versioned::from_state(&tx.outputs[0]).unwrap();

    let scored = pending.record.scored(0.05, CreditScoreDesc::Poor);
    let err = ledger
        .submit(proposal(
            Party::CreditAgency,
            LoanCommand::PostCreditCheckResult,
            Some(&pending),
            &scored,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ValidationRejected { .. }));

    let current = ledger.current(check.id).await.unwrap().unwrap();
    assert_eq!(current.state_ref, pending.state_ref);
}

#[tokio::test]
async fn test_finance_agency_cannot_post_credit_result() {
    let ledger = network().await;
    let applied = apply(&ledger, LoanTerms::new("Acme", "Retail", 10_000)).await;
    let check = CreditCheckRecord::for_application(LinearId::new(), &applied.record);
    let tx = ledger
        .submit(proposal(
            Party::FinanceAgency,
            LoanCommand::InitiateCreditCheck,
            None,
            &check,
        ))
        .await
        .unwrap();
    let pending: Versioned<CreditCheckRecord> = Versioned::from_state(&tx.outputs[0]).unwrap();

    let scored = pending.record.scored(9.5, CreditScoreDesc::Good);
    let err = ledger
        .submit(proposal(
            Party::FinanceAgency,
            LoanCommand::PostCreditCheckResult,
            Some(&pending),
            &scored,
        ))
        .await
        .unwrap_err();
    match err {
        LedgerError::ValidationRejected { reason, .. } => {
            assert!(reason.contains("must be started by CreditAgency"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let current = ledger.current(check.id).await.unwrap().unwrap();
    let current = CreditCheckRecord::from_state(&current).unwrap();
    assert_eq!(current.credit_score_desc, CreditScoreDesc::Unspecified);
}

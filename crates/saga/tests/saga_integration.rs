//! End-to-end tests of the loan saga on an in-memory ledger.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{LinearId, Party};
use domain::{
    AbstractStatus, BankProcessingStatus, CreditScoreDesc, LoanApplicationRecord,
    LoanApplicationStatus, LoanCommand,
};
use ledger::{InMemoryLedger, LedgerConfig};
use saga::{
    CreditScorer, FinanceAgencyFlows, FixedCreditScorer, FlowError, LoanNetwork, SagaConfig,
    SagaProgress, SagaStep, register_parties,
};

struct TestHarness {
    ledger: InMemoryLedger,
    network: LoanNetwork<InMemoryLedger>,
}

impl TestHarness {
    async fn new(scorer: impl CreditScorer + 'static) -> Self {
        Self::with_config(scorer, LedgerConfig::default(), SagaConfig::default()).await
    }

    async fn with_config(
        scorer: impl CreditScorer + 'static,
        ledger_config: LedgerConfig,
        saga_config: SagaConfig,
    ) -> Self {
        let ledger = InMemoryLedger::new(ledger_config);
        register_parties(&ledger).await;
        let network = LoanNetwork::start(ledger.clone(), saga_config, Arc::new(scorer))
            .await
            .unwrap();
        Self { ledger, network }
    }

    fn finance(&self) -> &FinanceAgencyFlows<InMemoryLedger> {
        self.network.finance()
    }

    async fn apply(&self) -> LinearId {
        self.finance()
            .create_application("Acme Corp", "Retail", 50_000)
            .await
            .unwrap()
            .record
            .id
    }

    async fn wait_for(
        &self,
        loan_id: LinearId,
        done: impl Fn(&SagaProgress) -> bool,
    ) -> SagaProgress {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(progress) = self.finance().progress(loan_id).await.unwrap()
                && done(&progress)
            {
                return progress;
            }
            assert!(Instant::now() < deadline, "timed out waiting on {loan_id}");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn wait_for_status(&self, loan_id: LinearId, status: LoanApplicationStatus) -> SagaProgress {
        self.wait_for(loan_id, |p| p.status() == status).await
    }

    async fn settle(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.network.in_flight().await > 0 {
            assert!(Instant::now() < deadline, "flows never settled");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Ledger and flows with no observers, for driving steps by hand.
async fn manual_ledger(config: LedgerConfig) -> (InMemoryLedger, FinanceAgencyFlows<InMemoryLedger>) {
    let ledger = InMemoryLedger::new(config);
    register_parties(&ledger).await;
    let finance = FinanceAgencyFlows::new(ledger.clone());
    (ledger, finance)
}

#[tokio::test]
async fn test_happy_path_reaches_loan_disbursed() {
    let h = TestHarness::new(FixedCreditScorer::new(8.0)).await;
    let loan_id = h.apply().await;

    let progress = h
        .wait_for_status(loan_id, LoanApplicationStatus::LoanDisbursed)
        .await;
    h.settle().await;

    assert_eq!(progress.abstract_status(), AbstractStatus::Processed);
    assert!(progress.is_terminal());
    assert_eq!(progress.next_step(), None);

    let check = progress.credit_check.unwrap();
    assert_eq!(check.record.credit_score_desc, CreditScoreDesc::Good);
    assert_eq!(check.record.loan_application_id, loan_id);

    let request = progress.bank_processing.unwrap();
    assert_eq!(request.record.processing_status, BankProcessingStatus::Processed);
    assert_eq!(request.record.credit_score_desc, CreditScoreDesc::Good);

    // apply, forward, initiate, score, record, forward, initiate, decide, record
    assert_eq!(h.ledger.transaction_count().await, 9);

    let history = h.finance().application_history(loan_id).await.unwrap();
    let statuses: Vec<_> = history.iter().map(|v| v.record.status).collect();
    assert_eq!(
        statuses,
        vec![
            LoanApplicationStatus::Applied,
            LoanApplicationStatus::ForwardedToCreditCheckAgency,
            LoanApplicationStatus::CreditScoreCheckPass,
            LoanApplicationStatus::ForwardedToBank,
            LoanApplicationStatus::LoanDisbursed,
        ]
    );
    assert!(history[..4].iter().all(|v| v.consumed));
    assert_eq!(history[4].version.as_i64(), 5);

    h.network.shutdown().await;
}

#[tokio::test]
async fn test_poor_score_fails_credit_check_without_bank_request() {
    let h = TestHarness::new(FixedCreditScorer::new(3.0)).await;
    let loan_id = h.apply().await;

    let progress = h
        .wait_for_status(loan_id, LoanApplicationStatus::CreditScoreCheckFailed)
        .await;
    h.settle().await;

    assert_eq!(progress.abstract_status(), AbstractStatus::Rejected);
    assert_eq!(
        progress.credit_check.unwrap().record.credit_score_desc,
        CreditScoreDesc::Poor
    );
    assert!(progress.bank_processing.is_none());
    assert!(
        h.network
            .bank()
            .bank_request_for_application(loan_id)
            .await
            .unwrap()
            .is_none()
    );

    h.network.shutdown().await;
}

#[tokio::test]
async fn test_fair_score_is_disbursed() {
    let h = TestHarness::new(FixedCreditScorer::new(6.0)).await;
    let loan_id = h.apply().await;

    let progress = h
        .wait_for_status(loan_id, LoanApplicationStatus::LoanDisbursed)
        .await;
    let request = progress.bank_processing.unwrap();
    assert_eq!(request.record.credit_score_desc, CreditScoreDesc::Fair);
    assert_eq!(request.record.processing_status, BankProcessingStatus::Processed);

    h.network.shutdown().await;
}

#[tokio::test]
async fn test_many_applications_each_settle_once() {
    let h = TestHarness::new(FixedCreditScorer::new(9.0)).await;

    let mut loan_ids = Vec::new();
    for i in 0..20 {
        let application = h
            .finance()
            .create_application(&format!("Company {i}"), "Manufacturing", 1_000 + i)
            .await
            .unwrap();
        loan_ids.push(application.record.id);
    }
    for loan_id in &loan_ids {
        h.wait_for_status(*loan_id, LoanApplicationStatus::LoanDisbursed)
            .await;
    }
    h.settle().await;

    assert_eq!(h.finance().credit_checks().await.unwrap().len(), 20);
    assert_eq!(h.finance().bank_requests().await.unwrap().len(), 20);
    assert_eq!(h.ledger.transaction_count().await, 20 * 9);

    h.network.shutdown().await;
}

#[tokio::test]
async fn test_redelivered_commit_is_dropped() {
    let h = TestHarness::new(FixedCreditScorer::new(8.0)).await;
    let applied = h
        .finance()
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap();
    h.wait_for_status(applied.record.id, LoanApplicationStatus::LoanDisbursed)
        .await;
    h.settle().await;
    let committed = h.ledger.transaction_count().await;

    h.ledger.redeliver(applied.state_ref).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.settle().await;

    assert_eq!(h.ledger.transaction_count().await, committed);
    h.network.shutdown().await;
}

#[tokio::test]
async fn test_stale_trigger_leaves_ledger_unchanged() {
    // No dedup window: the redelivered state reaches the flow, which finds
    // the application already moved on.
    let mut config = SagaConfig::default();
    config.dedup_window = 0;
    let h = TestHarness::with_config(FixedCreditScorer::new(3.0), LedgerConfig::default(), config)
        .await;
    let applied = h
        .finance()
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap();
    h.wait_for_status(applied.record.id, LoanApplicationStatus::CreditScoreCheckFailed)
        .await;
    h.settle().await;
    let committed = h.ledger.transaction_count().await;

    h.ledger.redeliver(applied.state_ref).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.settle().await;

    assert_eq!(h.ledger.transaction_count().await, committed);
    let application = h.finance().application(applied.record.id).await.unwrap().unwrap();
    assert_eq!(application.record.status, LoanApplicationStatus::CreditScoreCheckFailed);
    h.network.shutdown().await;
}

#[tokio::test]
async fn test_scorer_failure_leaves_check_pending() {
    let scorer = FixedCreditScorer::new(8.0);
    scorer.set_fail(true);
    let h = TestHarness::new(scorer.clone()).await;
    let loan_id = h.apply().await;

    h.wait_for(loan_id, |p| p.credit_check.is_some()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.settle().await;

    let progress = h.finance().progress(loan_id).await.unwrap().unwrap();
    assert_eq!(progress.status(), LoanApplicationStatus::ForwardedToCreditCheckAgency);
    assert_eq!(progress.next_step(), Some(SagaStep::ScoreCreditCheck));

    // Scoring by hand once the scorer recovers resumes the saga.
    scorer.set_fail(false);
    let check_id = progress.credit_check.unwrap().record.id;
    h.network.credit().score_credit_check(check_id).await.unwrap();
    h.wait_for_status(loan_id, LoanApplicationStatus::LoanDisbursed)
        .await;

    h.network.shutdown().await;
}

#[tokio::test]
async fn test_partial_network_stops_at_missing_party() {
    let config = SagaConfig::default().with_parties(vec![Party::FinanceAgency]);
    let h = TestHarness::with_config(FixedCreditScorer::new(8.0), LedgerConfig::default(), config)
        .await;
    assert_eq!(h.network.observer_count(), 3);

    let loan_id = h.apply().await;
    let progress = h.wait_for(loan_id, |p| p.credit_check.is_some()).await;
    h.settle().await;

    assert_eq!(progress.abstract_status(), AbstractStatus::DecisionPending);
    assert_eq!(progress.next_step(), Some(SagaStep::ScoreCreditCheck));
    assert_eq!(
        progress.next_step().map(|step| step.owner()),
        Some(Party::CreditAgency)
    );

    h.network.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_observers() {
    let h = TestHarness::new(FixedCreditScorer::new(8.0)).await;
    let ledger = h.ledger.clone();
    h.network.shutdown().await;

    let finance = FinanceAgencyFlows::new(ledger);
    let application = finance
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let current = finance.application(application.record.id).await.unwrap().unwrap();
    assert_eq!(current.record.status, LoanApplicationStatus::Applied);
}

#[tokio::test]
async fn test_invalid_terms_rejected_by_finance_agency() {
    let (ledger, finance) = manual_ledger(LedgerConfig::default()).await;

    let err = finance
        .create_application("Acme Corp", "Retail", 0)
        .await
        .unwrap_err();
    match err {
        FlowError::ValidationRejected { party, reason } => {
            assert_eq!(party, Party::FinanceAgency);
            assert!(reason.contains("amount"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = finance
        .create_application("  ", "Retail", 1_000)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::ValidationRejected { .. }));

    assert_eq!(ledger.transaction_count().await, 0);
    assert!(finance.applications().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_forward_commits_once() {
    let (_ledger, finance) = manual_ledger(LedgerConfig::default()).await;
    let loan_id = finance
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap()
        .record
        .id;

    let (first, second) = tokio::join!(
        finance.forward_to_credit_check(loan_id),
        finance.forward_to_credit_check(loan_id)
    );
    let outcomes = [first, second];
    let committed: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(committed.len(), 1);
    let stale = outcomes.iter().filter_map(|r| r.as_ref().err()).next().unwrap();
    assert!(stale.is_stale_trigger(), "{stale}");

    let history = finance.application_history(loan_id).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_duplicate_initiation_collides_on_assigned_id() {
    let (_ledger, finance) = manual_ledger(LedgerConfig::default()).await;
    let loan_id = finance
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap()
        .record
        .id;
    finance.forward_to_credit_check(loan_id).await.unwrap();

    let check = finance.initiate_credit_check(loan_id).await.unwrap();
    let err = finance.initiate_credit_check(loan_id).await.unwrap_err();
    assert!(matches!(err, FlowError::ConflictingVersion(_)), "{err}");

    let checks = finance.credit_checks().await.unwrap();
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].record.id, check.record.id);
}

#[tokio::test]
async fn test_step_out_of_order_is_not_found() {
    let (_ledger, finance) = manual_ledger(LedgerConfig::default()).await;
    let loan_id = finance
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap()
        .record
        .id;

    let err = finance.forward_to_bank(loan_id).await.unwrap_err();
    assert!(matches!(err, FlowError::RecordNotFound { .. }), "{err}");

    let err = finance.record_credit_result(LinearId::new()).await.unwrap_err();
    assert!(matches!(err, FlowError::RecordNotFound { .. }), "{err}");
}

#[tokio::test]
async fn test_skipping_credit_check_rejected_by_contract() {
    let (ledger, finance) = manual_ledger(LedgerConfig::default()).await;
    let applied = finance
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap();
    let before = ledger.transaction_count().await;

    let bank_processing_id = LinearId::new();
    let skipped: LoanApplicationRecord = applied.record.forwarded_to_bank(bank_processing_id);
    let err = finance
        .context()
        .submit(
            LoanCommand::ForwardToBank { bank_processing_id },
            Some(&applied),
            &skipped,
        )
        .await
        .unwrap_err();
    match err {
        FlowError::ValidationRejected { reason, .. } => {
            assert!(reason.contains("CREDIT_SCORE_CHECK_PASS"), "{reason}")
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(ledger.transaction_count().await, before);
    let current = finance.application(applied.record.id).await.unwrap().unwrap();
    assert_eq!(current.record.status, LoanApplicationStatus::Applied);
}

#[tokio::test]
async fn test_too_low_score_rejected() {
    let (ledger, finance) = manual_ledger(LedgerConfig::default()).await;
    let credit = saga::CreditAgencyFlows::new(ledger.clone(), Arc::new(FixedCreditScorer::new(8.0)));
    let loan_id = finance
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap()
        .record
        .id;
    finance.forward_to_credit_check(loan_id).await.unwrap();
    let check = finance.initiate_credit_check(loan_id).await.unwrap();

    let err = credit
        .post_credit_check_result(check.record.id, 0.05, CreditScoreDesc::Poor)
        .await
        .unwrap_err();
    match err {
        FlowError::ValidationRejected { reason, .. } => {
            assert!(reason.contains("greater than"), "{reason}")
        }
        other => panic!("unexpected error: {other}"),
    }

    let current = credit
        .credit_check_for_application(loan_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.record.credit_score_desc, CreditScoreDesc::Unspecified);
    assert_eq!(current.version, check.version);
}

#[tokio::test]
async fn test_unreachable_signer_leaves_state_unchanged() {
    let config = LedgerConfig::default().with_signature_timeout(Duration::from_millis(100));
    let (ledger, finance) = manual_ledger(config).await;
    let loan_id = finance
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap()
        .record
        .id;
    finance.forward_to_credit_check(loan_id).await.unwrap();

    ledger.set_reachable(Party::CreditAgency, false).await;
    let err = finance.initiate_credit_check(loan_id).await.unwrap_err();
    assert!(
        matches!(err, FlowError::SignerUnreachable { party: Party::CreditAgency, .. }),
        "{err}"
    );
    assert!(finance.credit_checks().await.unwrap().is_empty());

    // Once the credit agency is back the same step goes through.
    ledger.set_reachable(Party::CreditAgency, true).await;
    finance.initiate_credit_check(loan_id).await.unwrap();
    let progress = finance.progress(loan_id).await.unwrap().unwrap();
    assert_eq!(progress.next_step(), Some(SagaStep::ScoreCreditCheck));
}

#[tokio::test]
async fn test_observers_recover_commits_dropped_by_a_full_feed() {
    let ledger_config = LedgerConfig {
        feed_capacity: 2,
        ..LedgerConfig::default()
    };
    let h = TestHarness::with_config(
        FixedCreditScorer::new(8.0),
        ledger_config,
        SagaConfig::default(),
    )
    .await;

    let mut loan_ids = Vec::new();
    for i in 0..30 {
        let application = h
            .finance()
            .create_application(&format!("Company {i}"), "Retail", 5_000 + i)
            .await
            .unwrap();
        loan_ids.push(application.record.id);
    }
    for loan_id in &loan_ids {
        h.wait_for_status(*loan_id, LoanApplicationStatus::LoanDisbursed)
            .await;
    }
    h.settle().await;

    assert_eq!(h.finance().bank_requests().await.unwrap().len(), 30);
    assert_eq!(h.ledger.transaction_count().await, 30 * 9);

    h.network.shutdown().await;
}

#[tokio::test]
async fn test_finance_agency_cannot_post_credit_result() {
    let (ledger, finance) = manual_ledger(LedgerConfig::default()).await;
    let loan_id = finance
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap()
        .record
        .id;
    finance.forward_to_credit_check(loan_id).await.unwrap();
    let check = finance.initiate_credit_check(loan_id).await.unwrap();
    let before = ledger.transaction_count().await;

    let scored = check.record.scored(9.5, CreditScoreDesc::Good);
    let err = finance
        .context()
        .submit(LoanCommand::PostCreditCheckResult, Some(&check), &scored)
        .await
        .unwrap_err();
    match err {
        FlowError::ValidationRejected { party, reason } => {
            assert_eq!(party, Party::FinanceAgency);
            assert!(reason.contains("must be started by CreditAgency"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(ledger.transaction_count().await, before);
    let checks = finance.credit_checks().await.unwrap();
    assert_eq!(checks[0].record.credit_score_desc, CreditScoreDesc::Unspecified);
}

#[tokio::test]
async fn test_recorded_credit_result_must_match_posted_check() {
    let (ledger, finance) = manual_ledger(LedgerConfig::default()).await;
    let credit = saga::CreditAgencyFlows::new(ledger.clone(), Arc::new(FixedCreditScorer::new(3.0)));
    let loan_id = finance
        .create_application("Acme Corp", "Retail", 50_000)
        .await
        .unwrap()
        .record
        .id;
    let forwarded = finance.forward_to_credit_check(loan_id).await.unwrap();
    let check = finance.initiate_credit_check(loan_id).await.unwrap();
    let posted = credit
        .post_credit_check_result(check.record.id, 3.0, CreditScoreDesc::Poor)
        .await
        .unwrap();
    let before = ledger.transaction_count().await;

    let claimed = LoanCommand::RecordCreditResult {
        credit_check_id: check.record.id,
        credit_score_desc: CreditScoreDesc::Good,
    };
    let passed = forwarded
        .record
        .with_credit_result(LoanApplicationStatus::CreditScoreCheckPass);
    let err = finance
        .context()
        .submit_referencing(claimed.clone(), Some(&forwarded), &[posted.state_ref], &passed)
        .await
        .unwrap_err();
    match err {
        FlowError::ValidationRejected { reason, .. } => {
            assert!(reason.contains("is rated POOR, not GOOD"), "{reason}")
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = finance
        .context()
        .submit(claimed, Some(&forwarded), &passed)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::ValidationRejected { .. }), "{err}");
    assert_eq!(ledger.transaction_count().await, before);

    let recorded = finance.record_credit_result(check.record.id).await.unwrap();
    assert_eq!(
        recorded.record.status,
        LoanApplicationStatus::CreditScoreCheckFailed
    );
    let current = credit
        .credit_check_for_application(loan_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.state_ref, posted.state_ref);
    assert!(!current.consumed);
}

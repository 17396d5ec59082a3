//! Wiring of the three parties into one running loan network.

use std::sync::Arc;

use common::Party;
use domain::PartyVerifier;
use ledger::{InMemoryLedger, Ledger};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SagaConfig;
use crate::flows::{BankFlows, CreditAgencyFlows, FinanceAgencyFlows};
use crate::observer::{
    ApplicationProgress, BankResultRecorder, CreditResultRecorder, CreditScoring, Disbursement,
    Reaction, spawn_observer,
};
use crate::services::CreditScorer;
use crate::worker::WorkerPool;

/// Registers every party's contract verifier as its signing hook.
pub async fn register_parties(ledger: &InMemoryLedger) {
    for party in Party::ALL {
        ledger
            .register_party(party, Arc::new(PartyVerifier::new(party)))
            .await;
    }
}

/// A running loan network: per-party flow handles plus the observers
/// advancing every application to a terminal state.
pub struct LoanNetwork<L> {
    ledger: L,
    finance: FinanceAgencyFlows<L>,
    credit: CreditAgencyFlows<L>,
    bank: BankFlows<L>,
    pool: Arc<WorkerPool>,
    shutdown: watch::Sender<bool>,
    observers: Vec<JoinHandle<()>>,
}

impl<L: Ledger + Clone + 'static> LoanNetwork<L> {
    /// Subscribes the observers of every party in `config.parties`.
    ///
    /// The ledger must already have the parties' verifiers registered.
    #[tracing::instrument(skip_all, fields(parties = ?config.parties))]
    pub async fn start(
        ledger: L,
        config: SagaConfig,
        scorer: Arc<dyn CreditScorer>,
    ) -> ledger::Result<Self> {
        let finance = FinanceAgencyFlows::new(ledger.clone());
        let credit = CreditAgencyFlows::new(ledger.clone(), scorer);
        let bank = BankFlows::new(ledger.clone());
        let pool = Arc::new(WorkerPool::new(config.worker_concurrency));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let mut reactions: Vec<Arc<dyn Reaction>> = Vec::new();
        if config.runs(Party::FinanceAgency) {
            reactions.push(Arc::new(ApplicationProgress::new(finance.clone())));
            reactions.push(Arc::new(CreditResultRecorder::new(finance.clone())));
            reactions.push(Arc::new(BankResultRecorder::new(finance.clone())));
        }
        if config.runs(Party::CreditAgency) {
            reactions.push(Arc::new(CreditScoring::new(
                credit.clone(),
                config.credit_decision_delay,
            )));
        }
        if config.runs(Party::Bank) {
            reactions.push(Arc::new(Disbursement::new(
                bank.clone(),
                config.bank_decision_delay,
            )));
        }

        let mut observers = Vec::with_capacity(reactions.len());
        for reaction in reactions {
            let handle = spawn_observer(
                &ledger,
                reaction,
                Arc::clone(&pool),
                shutdown_rx.clone(),
                config.dedup_window,
            )
            .await?;
            observers.push(handle);
        }

        tracing::info!(
            observers = observers.len(),
            worker_concurrency = pool.concurrency(),
            "loan network started"
        );
        Ok(Self {
            ledger,
            finance,
            credit,
            bank,
            pool,
            shutdown,
            observers,
        })
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn finance(&self) -> &FinanceAgencyFlows<L> {
        &self.finance
    }

    pub fn credit(&self) -> &CreditAgencyFlows<L> {
        &self.credit
    }

    pub fn bank(&self) -> &BankFlows<L> {
        &self.bank
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Flow work spawned by observers and not yet finished.
    pub async fn in_flight(&self) -> usize {
        self.pool.in_flight().await
    }

    /// Stops the observers, then waits for in-flight work to finish.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.observers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "observer task failed");
            }
        }
        self.pool.drain().await;
        tracing::info!("loan network stopped");
    }
}

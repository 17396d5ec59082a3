//! Change-feed observers that drive the saga forward.
//!
//! Each observer subscribes to one record type on behalf of one party. For
//! every committed state calling for a step it owns, it hands one unit of
//! work to the shared [`WorkerPool`] and goes straight back to the feed.

mod reactions;
mod recent;

use std::sync::Arc;

use async_trait::async_trait;
use common::Party;
use futures_util::StreamExt;
use ledger::{Ledger, LedgerError, StateEnvelope, StateQuery};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use reactions::{
    ApplicationProgress, BankResultRecorder, CreditResultRecorder, CreditScoring, Disbursement,
};
use recent::RecentSet;

use crate::error::Result;
use crate::state::SagaStep;
use crate::worker::WorkerPool;

/// What one party does when a record it watches changes.
#[async_trait]
pub trait Reaction: Send + Sync + 'static {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// The party running this reaction.
    fn party(&self) -> Party;

    /// The record type this reaction watches.
    fn record_type(&self) -> &'static str;

    /// The steps this reaction carries out.
    fn steps(&self) -> &'static [SagaStep];

    /// The feed subscription.
    fn query(&self) -> StateQuery {
        StateQuery::for_record_type(self.record_type()).participant(self.party())
    }

    /// Returns the step to run for a committed state, if this reaction owns it.
    fn wants(&self, state: &StateEnvelope) -> Option<SagaStep> {
        SagaStep::triggered_by(state).filter(|step| self.steps().contains(step))
    }

    /// Runs the step.
    async fn react(&self, step: SagaStep, state: &StateEnvelope) -> Result<()>;
}

/// Subscribes `reaction` to the ledger and spawns its dispatch loop.
///
/// The subscription is taken before this returns, so any commit made after
/// it returns is seen. If the observer falls behind and the feed drops
/// commits, it re-reads the live states it watches and dispatches whatever
/// it has not handled yet. The loop ends when `shutdown` flips or the feed
/// closes.
pub async fn spawn_observer<L: Ledger + Clone + 'static>(
    ledger: &L,
    reaction: Arc<dyn Reaction>,
    pool: Arc<WorkerPool>,
    mut shutdown: watch::Receiver<bool>,
    dedup_window: usize,
) -> ledger::Result<JoinHandle<()>> {
    let mut feed = ledger.subscribe(reaction.query()).await?;
    let ledger = ledger.clone();
    let name = reaction.name();
    let party = reaction.party();

    Ok(tokio::spawn(async move {
        let mut dispatcher = Dispatcher {
            reaction,
            pool,
            recent: RecentSet::new(dedup_window),
        };
        tracing::info!(observer = name, %party, "observer started");

        loop {
            let next = tokio::select! {
                _ = shutdown.changed() => break,
                next = feed.next() => next,
            };
            let state = match next {
                Some(Ok(state)) => state,
                Some(Err(LedgerError::SubscriptionLagged(missed))) => {
                    tracing::warn!(observer = name, missed, "observer fell behind the feed");
                    metrics::counter!("observer_lagged_total", "observer" => name).increment(missed);
                    dispatcher.catch_up(&ledger).await;
                    continue;
                }
                Some(Err(e)) => {
                    tracing::error!(observer = name, error = %e, "feed error");
                    continue;
                }
                None => break,
            };

            let state_ref = state.state_ref;
            if let Dispatch::Duplicate = dispatcher.dispatch(state).await {
                tracing::debug!(observer = name, %state_ref, "duplicate delivery dropped");
                metrics::counter!("observer_duplicates_dropped_total", "observer" => name)
                    .increment(1);
            }
        }

        tracing::info!(observer = name, %party, "observer stopped");
    }))
}

enum Dispatch {
    Ignored,
    Duplicate,
    Spawned,
}

struct Dispatcher {
    reaction: Arc<dyn Reaction>,
    pool: Arc<WorkerPool>,
    recent: RecentSet,
}

impl Dispatcher {
    async fn dispatch(&mut self, state: StateEnvelope) -> Dispatch {
        let Some(step) = self.reaction.wants(&state) else {
            return Dispatch::Ignored;
        };
        if !self.recent.insert(state.state_ref) {
            return Dispatch::Duplicate;
        }

        metrics::counter!(
            "observer_triggers_total",
            "observer" => self.reaction.name(),
            "step" => step.as_str()
        )
        .increment(1);
        let reaction = Arc::clone(&self.reaction);
        self.pool.spawn(run_step(reaction, step, state)).await;
        Dispatch::Spawned
    }

    /// Dispatches every live watched state not seen recently. Consumed
    /// states are skipped since their step already ran.
    async fn catch_up<L: Ledger>(&mut self, ledger: &L) {
        let name = self.reaction.name();
        let states = match ledger.query(self.reaction.query()).await {
            Ok(states) => states,
            Err(e) => {
                tracing::error!(observer = name, error = %e, "catch-up query failed");
                return;
            }
        };

        let mut dispatched = 0u64;
        for state in states {
            if let Dispatch::Spawned = self.dispatch(state).await {
                dispatched += 1;
            }
        }
        tracing::info!(observer = name, dispatched, "caught up after lag");
        metrics::counter!("observer_catch_up_dispatched_total", "observer" => name)
            .increment(dispatched);
    }
}

async fn run_step(reaction: Arc<dyn Reaction>, step: SagaStep, state: StateEnvelope) {
    let name = reaction.name();
    match reaction.react(step, &state).await {
        Ok(()) => {
            tracing::debug!(observer = name, %step, linear_id = %state.linear_id, "step completed");
        }
        Err(e) if e.is_stale_trigger() => {
            tracing::info!(
                observer = name,
                %step,
                linear_id = %state.linear_id,
                reason = %e,
                "trigger already handled, dropped"
            );
            metrics::counter!("observer_stale_triggers_total", "observer" => name).increment(1);
        }
        Err(e) => {
            tracing::error!(
                observer = name,
                %step,
                linear_id = %state.linear_id,
                error = %e,
                "step failed"
            );
            metrics::counter!("observer_failures_total", "observer" => name, "reason" => e.kind())
                .increment(1);
        }
    }
}

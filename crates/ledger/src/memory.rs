use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use common::{LinearId, Party};
use futures_util::future::try_join_all;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::{
    CommittedTransaction, LedgerConfig, LedgerError, LedgerTransaction, Result, Signature,
    StateEnvelope, StateQuery, StateRef, TransactionProposal, TransactionVerifier, TxId, Version,
    store::{Ledger, StateStream, validate_proposal},
};

#[derive(Default)]
struct Arena {
    states: Vec<StateEnvelope>,
    index: HashMap<StateRef, usize>,
    by_linear_id: HashMap<LinearId, Vec<usize>>,
    transactions: HashMap<TxId, CommittedTransaction>,
}

impl Arena {
    fn get(&self, state_ref: &StateRef) -> Option<&StateEnvelope> {
        self.index.get(state_ref).and_then(|&i| self.states.get(i))
    }

    fn push(&mut self, state: StateEnvelope) {
        let position = self.states.len();
        self.index.insert(state.state_ref, position);
        self.by_linear_id
            .entry(state.linear_id)
            .or_default()
            .push(position);
        self.states.push(state);
    }

    fn mark_consumed(&mut self, state_ref: &StateRef, tx_id: TxId) {
        if let Some(&i) = self.index.get(state_ref)
            && let Some(state) = self.states.get_mut(i)
        {
            state.consumed_by = Some(tx_id);
        }
    }

    fn check_unconsumed(&self, state_ref: &StateRef) -> Result<&StateEnvelope> {
        let state = self
            .get(state_ref)
            .ok_or(LedgerError::StateNotFound(*state_ref))?;
        if let Some(consumed_by) = state.consumed_by {
            return Err(LedgerError::ConflictingVersion {
                state_ref: *state_ref,
                consumed_by,
            });
        }
        Ok(state)
    }
}

#[derive(Default)]
struct Network {
    verifiers: HashMap<Party, Arc<dyn TransactionVerifier>>,
    unreachable: HashSet<Party>,
}

/// In-memory ledger shared by every party of a network running in one process.
///
/// Keeps an arena of immutable state versions, collects signatures from the
/// registered parties' verifiers and publishes committed states on a
/// broadcast change feed.
#[derive(Clone)]
pub struct InMemoryLedger {
    arena: Arc<RwLock<Arena>>,
    network: Arc<RwLock<Network>>,
    feed: broadcast::Sender<StateEnvelope>,
    config: LedgerConfig,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl InMemoryLedger {
    /// Creates a new empty ledger.
    pub fn new(config: LedgerConfig) -> Self {
        let (feed, _) = broadcast::channel(config.feed_capacity.max(1));
        Self {
            arena: Arc::default(),
            network: Arc::default(),
            feed,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Registers a party and the verifier it runs before signing.
    pub async fn register_party(&self, party: Party, verifier: Arc<dyn TransactionVerifier>) {
        self.network.write().await.verifiers.insert(party, verifier);
        tracing::debug!(%party, "party registered on ledger");
    }

    /// Marks a registered party as reachable or not. Signature requests to an
    /// unreachable party never answer and run into the signature timeout.
    pub async fn set_reachable(&self, party: Party, reachable: bool) {
        let mut network = self.network.write().await;
        if reachable {
            network.unreachable.remove(&party);
        } else {
            network.unreachable.insert(party);
        }
    }

    /// Returns the total number of state versions stored.
    pub async fn state_count(&self) -> usize {
        self.arena.read().await.states.len()
    }

    /// Returns the total number of committed transactions.
    pub async fn transaction_count(&self) -> usize {
        self.arena.read().await.transactions.len()
    }

    /// Publishes an already committed state on the change feed again.
    pub async fn redeliver(&self, state_ref: StateRef) -> Result<()> {
        let state = self
            .arena
            .read()
            .await
            .get(&state_ref)
            .cloned()
            .ok_or(LedgerError::StateNotFound(state_ref))?;
        let _ = self.feed.send(state);
        Ok(())
    }

    async fn resolve(&self, proposal: TransactionProposal) -> Result<LedgerTransaction> {
        let arena = self.arena.read().await;
        let tx_id = TxId::new();

        let inputs = proposal
            .inputs
            .iter()
            .map(|state_ref| arena.check_unconsumed(state_ref).cloned())
            .collect::<Result<Vec<_>>>()?;
        let references = proposal
            .references
            .iter()
            .map(|state_ref| arena.check_unconsumed(state_ref).cloned())
            .collect::<Result<Vec<_>>>()?;

        let committed_at = Utc::now();
        let mut outputs = Vec::with_capacity(proposal.outputs.len());
        for (index, output) in proposal.outputs.into_iter().enumerate() {
            let version = match inputs.iter().find(|s| s.linear_id == output.linear_id) {
                Some(previous) => previous.version.next(),
                None if arena.by_linear_id.contains_key(&output.linear_id) => {
                    return Err(LedgerError::DuplicateLinearId(output.linear_id));
                }
                None => Version::first(),
            };
            outputs.push(StateEnvelope {
                state_ref: StateRef::new(tx_id, index as u32),
                linear_id: output.linear_id,
                record_type: output.record_type,
                version,
                participants: output.participants,
                payload: output.payload,
                committed_at,
                consumed_by: None,
            });
        }

        Ok(LedgerTransaction {
            tx_id,
            initiator: proposal.initiator,
            inputs,
            references,
            outputs,
            commands: proposal.commands,
        })
    }

    async fn collect_signatures(&self, tx: &LedgerTransaction) -> Result<Vec<Signature>> {
        // The initiator verifies locally before anything leaves its node.
        let own = self.request_signature(tx.initiator, tx, false).await?;

        let counterparties = tx
            .required_signers()
            .into_iter()
            .filter(|party| *party != tx.initiator);
        let mut signatures = try_join_all(
            counterparties.map(|party| self.request_signature(party, tx, true)),
        )
        .await?;

        signatures.insert(0, own);
        Ok(signatures)
    }

    async fn request_signature(
        &self,
        party: Party,
        tx: &LedgerTransaction,
        remote: bool,
    ) -> Result<Signature> {
        let (verifier, reachable) = {
            let network = self.network.read().await;
            (
                network.verifiers.get(&party).cloned(),
                !network.unreachable.contains(&party),
            )
        };
        let verifier = verifier.ok_or_else(|| LedgerError::SignerUnreachable {
            party,
            reason: "party is not registered on the network".to_string(),
        })?;

        let latency = self.config.signing_latency;
        let exchange = async {
            if remote {
                if !reachable {
                    std::future::pending::<()>().await;
                }
                if !latency.is_zero() {
                    tokio::time::sleep(latency).await;
                }
            }
            verifier.verify(tx)
        };

        match tokio::time::timeout(self.config.signature_timeout, exchange).await {
            Err(_) => Err(LedgerError::SignerUnreachable {
                party,
                reason: format!(
                    "no signature within {} ms",
                    self.config.signature_timeout.as_millis()
                ),
            }),
            Ok(Err(reason)) => Err(LedgerError::ValidationRejected { party, reason }),
            Ok(Ok(())) => Ok(Signature {
                party,
                signed_at: Utc::now(),
            }),
        }
    }

    async fn commit(
        &self,
        mut tx: LedgerTransaction,
        signatures: Vec<Signature>,
    ) -> Result<CommittedTransaction> {
        let mut arena = self.arena.write().await;

        // Another transaction may have consumed an input or a reference while
        // signatures were collected.
        for state in tx.inputs.iter().chain(&tx.references) {
            arena.check_unconsumed(&state.state_ref)?;
        }
        for output in &tx.outputs {
            let supersedes = tx.inputs.iter().any(|s| s.linear_id == output.linear_id);
            if !supersedes && arena.by_linear_id.contains_key(&output.linear_id) {
                return Err(LedgerError::DuplicateLinearId(output.linear_id));
            }
        }

        let committed_at = Utc::now();
        for input in &tx.inputs {
            arena.mark_consumed(&input.state_ref, tx.tx_id);
        }
        for output in &mut tx.outputs {
            output.committed_at = committed_at;
            arena.push(output.clone());
        }

        let committed = CommittedTransaction {
            tx_id: tx.tx_id,
            initiator: tx.initiator,
            inputs: tx.inputs.iter().map(|s| s.state_ref).collect(),
            references: tx.references.iter().map(|s| s.state_ref).collect(),
            outputs: tx.outputs,
            commands: tx.commands,
            signatures,
            committed_at,
        };
        arena.transactions.insert(committed.tx_id, committed.clone());

        // Published under the write lock so feed order matches commit order.
        for output in &committed.outputs {
            let _ = self.feed.send(output.clone());
        }

        Ok(committed)
    }

    async fn try_submit(&self, proposal: TransactionProposal) -> Result<CommittedTransaction> {
        validate_proposal(&proposal)?;
        let tx = self.resolve(proposal).await?;
        let signatures = self.collect_signatures(&tx).await?;
        self.commit(tx, signatures).await
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn query(&self, query: StateQuery) -> Result<Vec<StateEnvelope>> {
        let arena = self.arena.read().await;
        let states: Vec<_> = match query.linear_id {
            Some(id) => arena
                .by_linear_id
                .get(&id)
                .into_iter()
                .flatten()
                .filter_map(|&i| arena.states.get(i))
                .filter(|s| query.matches(s))
                .cloned()
                .collect(),
            None => arena
                .states
                .iter()
                .filter(|s| query.matches(s))
                .cloned()
                .collect(),
        };

        // Apply offset and limit
        let offset = query.offset.unwrap_or(0);
        let states: Vec<_> = states.into_iter().skip(offset).collect();

        let states = if let Some(limit) = query.limit {
            states.into_iter().take(limit).collect()
        } else {
            states
        };

        Ok(states)
    }

    #[tracing::instrument(
        skip(self, proposal),
        fields(
            initiator = %proposal.initiator,
            inputs = proposal.inputs.len(),
            outputs = proposal.outputs.len()
        )
    )]
    async fn submit(&self, proposal: TransactionProposal) -> Result<CommittedTransaction> {
        let start = Instant::now();
        let result = self.try_submit(proposal).await;

        match &result {
            Ok(tx) => {
                metrics::counter!("ledger_transactions_committed_total").increment(1);
                metrics::histogram!("ledger_submit_duration_seconds")
                    .record(start.elapsed().as_secs_f64());
                tracing::debug!(tx_id = %tx.tx_id, "transaction committed");
            }
            Err(e) => {
                metrics::counter!("ledger_submissions_rejected_total", "reason" => e.kind())
                    .increment(1);
                tracing::debug!(error = %e, "transaction not committed");
            }
        }

        result
    }

    async fn subscribe(&self, query: StateQuery) -> Result<StateStream> {
        let stream = BroadcastStream::new(self.feed.subscribe()).filter_map(move |item| match item {
            Ok(state) if query.matches_content(&state) => Some(Ok(state)),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                Some(Err(LedgerError::SubscriptionLagged(missed)))
            }
        });
        Ok(Box::pin(stream))
    }

    async fn history(&self, linear_id: LinearId) -> Result<Vec<StateEnvelope>> {
        let arena = self.arena.read().await;
        let mut states: Vec<_> = arena
            .by_linear_id
            .get(&linear_id)
            .into_iter()
            .flatten()
            .filter_map(|&i| arena.states.get(i))
            .cloned()
            .collect();
        states.sort_by_key(|s| s.version);
        Ok(states)
    }

    async fn transaction(&self, tx_id: TxId) -> Result<Option<CommittedTransaction>> {
        Ok(self.arena.read().await.transactions.get(&tx_id).cloned())
    }
}

use std::collections::HashSet;
use std::pin::Pin;

use async_trait::async_trait;
use common::LinearId;
use futures_core::Stream;

use crate::{
    CommittedTransaction, LedgerError, Result, StateEnvelope, StateQuery, StateRef,
    TransactionProposal, TxId,
};

/// A stream of committed states from the ledger's change feed.
pub type StateStream = Pin<Box<dyn Stream<Item = Result<StateEnvelope>> + Send>>;

/// Client contract of the shared, append-only, multi-party-signed ledger.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Returns the states matching a query, in commit order.
    async fn query(&self, query: StateQuery) -> Result<Vec<StateEnvelope>>;

    /// Submits a transaction and waits until it is fully signed and committed.
    ///
    /// Fails with `ValidationRejected` if any signer's verifier rejects it,
    /// `SignerUnreachable` if a counterparty does not answer in time and
    /// `ConflictingVersion` if another transaction consumed one of the inputs
    /// first. A failed submission leaves the ledger unchanged.
    async fn submit(&self, proposal: TransactionProposal) -> Result<CommittedTransaction>;

    /// Subscribes to states committed from now on that match `query`.
    ///
    /// Delivery is at least once. States of the same linear record arrive in
    /// commit order.
    async fn subscribe(&self, query: StateQuery) -> Result<StateStream>;

    /// Returns every version of a linear record, oldest first.
    async fn history(&self, linear_id: LinearId) -> Result<Vec<StateEnvelope>>;

    /// Retrieves a committed transaction.
    async fn transaction(&self, tx_id: TxId) -> Result<Option<CommittedTransaction>>;
}

/// Extension trait providing convenience methods for ledgers.
#[async_trait]
pub trait LedgerExt: Ledger {
    /// Returns the current version of a linear record.
    async fn current(&self, linear_id: LinearId) -> Result<Option<StateEnvelope>> {
        Ok(self
            .query(StateQuery::for_linear_id(linear_id).limit(1))
            .await?
            .into_iter()
            .next())
    }

    /// Returns the first current state matching a query.
    async fn find_unconsumed(&self, query: StateQuery) -> Result<Option<StateEnvelope>> {
        Ok(self.query(query.limit(1)).await?.into_iter().next())
    }

    /// Checks if any version of a linear record exists.
    async fn exists(&self, linear_id: LinearId) -> Result<bool> {
        Ok(!self.history(linear_id).await?.is_empty())
    }
}

// Blanket implementation for all Ledger implementations
impl<T: Ledger + ?Sized> LedgerExt for T {}

/// Structural checks run before a proposal is resolved or sent for signing.
pub fn validate_proposal(proposal: &TransactionProposal) -> Result<()> {
    if proposal.outputs.is_empty() && proposal.inputs.is_empty() {
        return Err(LedgerError::MalformedTransaction(
            "transaction has neither inputs nor outputs".to_string(),
        ));
    }
    if proposal.commands.is_empty() {
        return Err(LedgerError::MalformedTransaction(
            "transaction carries no command".to_string(),
        ));
    }
    if proposal.commands.iter().any(|c| c.signers.is_empty()) {
        return Err(LedgerError::MalformedTransaction(
            "every command needs at least one signer".to_string(),
        ));
    }
    if !proposal.required_signers().contains(&proposal.initiator) {
        return Err(LedgerError::MalformedTransaction(format!(
            "initiator {} is not a required signer",
            proposal.initiator
        )));
    }

    let mut seen: HashSet<StateRef> = HashSet::new();
    for input in &proposal.inputs {
        if !seen.insert(*input) {
            return Err(LedgerError::MalformedTransaction(format!(
                "input {input} is consumed twice"
            )));
        }
    }
    let mut referenced: HashSet<StateRef> = HashSet::new();
    for reference in &proposal.references {
        if seen.contains(reference) {
            return Err(LedgerError::MalformedTransaction(format!(
                "{reference} is both consumed and referenced"
            )));
        }
        if !referenced.insert(*reference) {
            return Err(LedgerError::MalformedTransaction(format!(
                "reference {reference} appears twice"
            )));
        }
    }

    let mut linear_ids: HashSet<LinearId> = HashSet::new();
    for output in &proposal.outputs {
        if !linear_ids.insert(output.linear_id) {
            return Err(LedgerError::MalformedTransaction(format!(
                "linear id {} appears in more than one output",
                output.linear_id
            )));
        }
        if output.participants.is_empty() {
            return Err(LedgerError::MalformedTransaction(format!(
                "output {} has no participants",
                output.linear_id
            )));
        }
    }

    Ok(())
}

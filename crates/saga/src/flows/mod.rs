//! Step flows: one procedure per saga transition, run as a specific party.
//!
//! Every flow follows the same shape. It resolves the current version of the
//! records it needs, builds the next version, and submits a transaction that
//! the ledger verifies and gets co-signed before committing.

mod bank;
mod credit;
mod finance;

use std::future::Future;
use std::time::Instant;

use common::{LinearId, Party};
use domain::{DomainError, LinearRecord, LoanCommand, Versioned};
use ledger::{Ledger, LedgerError, LedgerExt, StateQuery, StateRef, TransactionProposal};

pub use bank::BankFlows;
pub use credit::CreditAgencyFlows;
pub use finance::FinanceAgencyFlows;

use crate::error::{FlowError, Result};

/// A party's handle on the ledger, shared by that party's flows.
#[derive(Clone)]
pub struct FlowContext<L> {
    ledger: L,
    party: Party,
}

impl<L: Ledger + Clone> FlowContext<L> {
    pub fn new(ledger: L, party: Party) -> Self {
        Self { ledger, party }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn party(&self) -> Party {
        self.party
    }

    /// Returns the current version of a record, if any.
    pub async fn current<R: LinearRecord>(&self, id: LinearId) -> Result<Option<Versioned<R>>> {
        let query = StateQuery::for_linear_id(id).record_type(R::RECORD_TYPE);
        match self.ledger.find_unconsumed(query).await? {
            Some(state) => Ok(Some(Versioned::from_state(&state)?)),
            None => Ok(None),
        }
    }

    /// Returns the current version of a record if it is in the expected state.
    ///
    /// A record that is absent or has already moved on is reported as
    /// [`FlowError::RecordNotFound`].
    pub async fn resolve<R: LinearRecord>(
        &self,
        id: LinearId,
        expectation: &str,
        expected: impl Fn(&R) -> bool,
    ) -> Result<Versioned<R>> {
        match self.current::<R>(id).await? {
            Some(current) if expected(&current.record) => Ok(current),
            Some(_) => Err(FlowError::not_found(
                R::RECORD_TYPE,
                id,
                format!("no current version {expectation}"),
            )),
            None => Err(FlowError::not_found(R::RECORD_TYPE, id, "no current version")),
        }
    }

    /// Returns the current record whose `field` equals `value`.
    pub async fn find_by_field<R: LinearRecord>(
        &self,
        field: &str,
        value: impl Into<serde_json::Value>,
    ) -> Result<Option<Versioned<R>>> {
        let query = StateQuery::for_record_type(R::RECORD_TYPE).field_eq(field, value);
        match self.ledger.find_unconsumed(query).await? {
            Some(state) => Ok(Some(Versioned::from_state(&state)?)),
            None => Ok(None),
        }
    }

    /// Lists current records of one type that this party has a stake in.
    pub async fn list<R: LinearRecord>(&self) -> Result<Vec<Versioned<R>>> {
        let query = StateQuery::for_record_type(R::RECORD_TYPE).participant(self.party);
        self.ledger
            .query(query)
            .await?
            .iter()
            .map(|state| Versioned::from_state(state).map_err(FlowError::from))
            .collect()
    }

    /// Returns every version of a record, oldest first.
    pub async fn history<R: LinearRecord>(&self, id: LinearId) -> Result<Vec<Versioned<R>>> {
        self.ledger
            .history(id)
            .await?
            .iter()
            .filter(|state| state.record_type == R::RECORD_TYPE)
            .map(|state| Versioned::from_state(state).map_err(FlowError::from))
            .collect()
    }

    /// Submits a single-command transaction that supersedes `input` (or
    /// issues a new record) with `output`, and returns the committed version.
    pub async fn submit<R: LinearRecord>(
        &self,
        command: LoanCommand,
        input: Option<&Versioned<R>>,
        output: &R,
    ) -> Result<Versioned<R>> {
        self.submit_referencing(command, input, &[], output).await
    }

    /// Like [`submit`](Self::submit), also handing the signers `references`
    /// to read. References are not consumed but must still be current when
    /// the transaction commits.
    pub async fn submit_referencing<R: LinearRecord>(
        &self,
        command: LoanCommand,
        input: Option<&Versioned<R>>,
        references: &[StateRef],
        output: &R,
    ) -> Result<Versioned<R>> {
        let envelope = command.to_envelope().map_err(DomainError::from)?;
        let mut proposal = TransactionProposal::new(self.party)
            .command(envelope)
            .output(output.to_output()?);
        if let Some(input) = input {
            proposal = proposal.input(input.state_ref);
        }
        for reference in references {
            proposal = proposal.reference(*reference);
        }

        let committed = self.ledger.submit(proposal).await?;
        let state = committed.single_output(R::RECORD_TYPE).ok_or_else(|| {
            FlowError::Ledger(LedgerError::MalformedTransaction(format!(
                "transaction {} has no single {} output",
                committed.tx_id,
                R::RECORD_TYPE
            )))
        })?;
        Ok(Versioned::from_state(state)?)
    }
}

/// Runs a flow body and records its outcome.
pub(crate) async fn measured<T>(
    flow: &'static str,
    body: impl Future<Output = Result<T>>,
) -> Result<T> {
    let start = Instant::now();
    let result = body.await;
    metrics::histogram!("flow_duration_seconds", "flow" => flow)
        .record(start.elapsed().as_secs_f64());
    match &result {
        Ok(_) => metrics::counter!("flow_commits_total", "flow" => flow).increment(1),
        Err(e) => {
            metrics::counter!("flow_failures_total", "flow" => flow, "reason" => e.kind())
                .increment(1)
        }
    }
    result
}

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::Party;
use serde::{Deserialize, Serialize};

use crate::{OutputState, StateEnvelope, StateRef, TxId};

/// A command carried by a transaction together with the parties that must sign it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// The command name (e.g. "ApplyForLoan").
    pub command_type: String,

    /// The command contents as JSON.
    pub payload: serde_json::Value,

    /// Parties whose signatures the command requires.
    pub signers: Vec<Party>,
}

impl CommandEnvelope {
    pub fn new(
        command_type: impl Into<String>,
        payload: serde_json::Value,
        signers: Vec<Party>,
    ) -> Self {
        Self {
            command_type: command_type.into(),
            payload,
            signers,
        }
    }
}

/// A transaction as built by the initiating party, before signature collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionProposal {
    pub initiator: Party,
    pub inputs: Vec<StateRef>,
    /// States read but not consumed. They must be unconsumed at commit.
    #[serde(default)]
    pub references: Vec<StateRef>,
    pub outputs: Vec<OutputState>,
    pub commands: Vec<CommandEnvelope>,
}

impl TransactionProposal {
    /// Starts an empty proposal initiated by `initiator`.
    pub fn new(initiator: Party) -> Self {
        Self {
            initiator,
            inputs: Vec::new(),
            references: Vec::new(),
            outputs: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Adds an input state to consume.
    pub fn input(mut self, state_ref: StateRef) -> Self {
        self.inputs.push(state_ref);
        self
    }

    /// Adds a state that verifiers may read without it being consumed.
    pub fn reference(mut self, state_ref: StateRef) -> Self {
        self.references.push(state_ref);
        self
    }

    /// Adds an output state to produce.
    pub fn output(mut self, output: OutputState) -> Self {
        self.outputs.push(output);
        self
    }

    /// Adds a command.
    pub fn command(mut self, command: CommandEnvelope) -> Self {
        self.commands.push(command);
        self
    }

    /// Union of the signers of every command.
    pub fn required_signers(&self) -> BTreeSet<Party> {
        required_signers(&self.commands)
    }
}

/// A proposal with its inputs resolved and its outputs placed, as seen by verifiers.
#[derive(Debug, Clone)]
pub struct LedgerTransaction {
    pub tx_id: TxId,
    pub initiator: Party,
    pub inputs: Vec<StateEnvelope>,
    pub references: Vec<StateEnvelope>,
    pub outputs: Vec<StateEnvelope>,
    pub commands: Vec<CommandEnvelope>,
}

impl LedgerTransaction {
    /// Union of the signers of every command.
    pub fn required_signers(&self) -> BTreeSet<Party> {
        required_signers(&self.commands)
    }

    /// Inputs of the given record type.
    pub fn inputs_of<'a>(&'a self, record_type: &'a str) -> impl Iterator<Item = &'a StateEnvelope> {
        self.inputs.iter().filter(move |s| s.record_type == record_type)
    }

    /// Outputs of the given record type.
    pub fn outputs_of<'a>(
        &'a self,
        record_type: &'a str,
    ) -> impl Iterator<Item = &'a StateEnvelope> {
        self.outputs.iter().filter(move |s| s.record_type == record_type)
    }
}

/// A party's signature over a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub party: Party,
    pub signed_at: DateTime<Utc>,
}

/// A fully signed transaction that has been committed to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedTransaction {
    pub tx_id: TxId,
    pub initiator: Party,
    pub inputs: Vec<StateRef>,
    #[serde(default)]
    pub references: Vec<StateRef>,
    pub outputs: Vec<StateEnvelope>,
    pub commands: Vec<CommandEnvelope>,
    pub signatures: Vec<Signature>,
    pub committed_at: DateTime<Utc>,
}

impl CommittedTransaction {
    /// Returns the single output of the given record type, if exactly one exists.
    pub fn single_output(&self, record_type: &str) -> Option<&StateEnvelope> {
        let mut outputs = self.outputs.iter().filter(|s| s.record_type == record_type);
        match (outputs.next(), outputs.next()) {
            (Some(state), None) => Some(state),
            _ => None,
        }
    }

    /// Returns true if `party` signed this transaction.
    pub fn is_signed_by(&self, party: Party) -> bool {
        self.signatures.iter().any(|s| s.party == party)
    }
}

fn required_signers(commands: &[CommandEnvelope]) -> BTreeSet<Party> {
    commands
        .iter()
        .flat_map(|c| c.signers.iter().copied())
        .collect()
}

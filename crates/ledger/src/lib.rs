//! Client contract of the shared multi-party ledger.
//!
//! Records are linear: each version is an immutable [`StateEnvelope`] and a
//! change is a [`TransactionProposal`] that consumes the current version and
//! produces the next one. A proposal is committed only after every required
//! signer's [`TransactionVerifier`] has accepted it.

pub mod config;
pub mod error;
pub mod memory;
pub mod query;
pub mod state;
pub mod store;
pub mod transaction;
pub mod verifier;

pub use common::{LinearId, Party};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use memory::InMemoryLedger;
pub use query::{StateQuery, StateStatus};
pub use state::{OutputState, StateEnvelope, StateEnvelopeBuilder, StateRef, TxId, Version};
pub use store::{Ledger, LedgerExt, StateStream};
pub use transaction::{
    CommandEnvelope, CommittedTransaction, LedgerTransaction, Signature, TransactionProposal,
};
pub use verifier::TransactionVerifier;

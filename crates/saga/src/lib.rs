//! Saga layer of the loan-approval network.
//!
//! A loan moves through the saga one committed transaction at a time:
//! 1. The finance agency forwards a new application and issues its credit check
//! 2. The credit agency scores the check
//! 3. The finance agency records the result; a pass is forwarded to the bank
//! 4. The bank decides the request
//! 5. The finance agency records the bank's decision
//!
//! No party calls another. Each step is started by an observer reacting to
//! the previous step's commit on the shared ledger, so any party can run on
//! its own node.

pub mod config;
pub mod error;
pub mod flows;
pub mod observer;
pub mod orchestration;
pub mod services;
pub mod state;
pub mod status;
pub mod worker;

pub use config::SagaConfig;
pub use error::{FlowError, Result};
pub use flows::{BankFlows, CreditAgencyFlows, FinanceAgencyFlows, FlowContext};
pub use observer::{Reaction, spawn_observer};
pub use orchestration::{LoanNetwork, register_parties};
pub use services::{CreditScore, CreditScorer, FixedCreditScorer, RandomCreditScorer};
pub use state::SagaStep;
pub use status::SagaProgress;
pub use worker::WorkerPool;

//! Decision services consulted by the flows.

pub mod credit_scorer;

pub use credit_scorer::{CreditScore, CreditScorer, FixedCreditScorer, RandomCreditScorer};

//! Credit scorer trait and implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::{CreditCheckRecord, CreditScoreDesc};
use rand::Rng;

use crate::error::FlowError;

/// A numeric credit score with its classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditScore {
    pub score: f64,
    pub desc: CreditScoreDesc,
}

impl CreditScore {
    /// Classifies a raw score.
    pub fn from_score(score: f64) -> Self {
        Self {
            score,
            desc: CreditScoreDesc::from_score(score),
        }
    }
}

/// Trait for the credit agency's scoring decision.
#[async_trait]
pub trait CreditScorer: Send + Sync {
    /// Scores a pending credit check.
    async fn score(&self, check: &CreditCheckRecord) -> Result<CreditScore, FlowError>;
}

/// Draws a score uniformly from `[0, 10)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCreditScorer;

#[async_trait]
impl CreditScorer for RandomCreditScorer {
    async fn score(&self, _check: &CreditCheckRecord) -> Result<CreditScore, FlowError> {
        let score = rand::thread_rng().gen_range(0.0..10.0);
        Ok(CreditScore::from_score(score))
    }
}

/// Returns the same score for every check. Used in tests and demos.
#[derive(Debug, Clone)]
pub struct FixedCreditScorer {
    score: f64,
    fail: Arc<AtomicBool>,
}

impl FixedCreditScorer {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a scorer whose every call fails.
    pub fn failing() -> Self {
        let scorer = Self::new(0.0);
        scorer.set_fail(true);
        scorer
    }

    /// Configures the scorer to fail on subsequent calls.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CreditScorer for FixedCreditScorer {
    async fn score(&self, _check: &CreditCheckRecord) -> Result<CreditScore, FlowError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FlowError::Decision("credit bureau unavailable".to_string()));
        }
        Ok(CreditScore::from_score(self.score))
    }
}

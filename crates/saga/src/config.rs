//! Saga configuration loaded from environment variables.

use std::time::Duration;

use common::Party;

/// Settings for the observers and their worker pool.
///
/// Reads from environment variables:
/// - `SAGA_WORKER_CONCURRENCY` — flows running at once (default: `16`)
/// - `SAGA_CREDIT_DECISION_DELAY_MS` — pause before the credit agency scores (default: `0`)
/// - `SAGA_BANK_DECISION_DELAY_MS` — pause before the bank decides (default: `0`)
/// - `SAGA_DEDUP_WINDOW` — recently dispatched states remembered per observer (default: `4096`)
/// - `SAGA_PARTIES` — comma-separated parties whose observers run here (default: all)
#[derive(Debug, Clone)]
pub struct SagaConfig {
    pub worker_concurrency: usize,
    pub credit_decision_delay: Duration,
    pub bank_decision_delay: Duration,
    pub dedup_window: usize,
    pub parties: Vec<Party>,
}

impl SagaConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            worker_concurrency: env_parse("SAGA_WORKER_CONCURRENCY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.worker_concurrency),
            credit_decision_delay: env_parse("SAGA_CREDIT_DECISION_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.credit_decision_delay),
            bank_decision_delay: env_parse("SAGA_BANK_DECISION_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.bank_decision_delay),
            dedup_window: env_parse("SAGA_DEDUP_WINDOW").unwrap_or(defaults.dedup_window),
            parties: std::env::var("SAGA_PARTIES")
                .ok()
                .and_then(|v| parse_parties(&v))
                .unwrap_or(defaults.parties),
        }
    }

    /// Returns true if this node runs `party`'s observers.
    pub fn runs(&self, party: Party) -> bool {
        self.parties.contains(&party)
    }

    pub fn with_worker_concurrency(mut self, worker_concurrency: usize) -> Self {
        self.worker_concurrency = worker_concurrency;
        self
    }

    pub fn with_decision_delays(mut self, credit: Duration, bank: Duration) -> Self {
        self.credit_decision_delay = credit;
        self.bank_decision_delay = bank;
        self
    }

    pub fn with_parties(mut self, parties: Vec<Party>) -> Self {
        self.parties = parties;
        self
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: 16,
            credit_decision_delay: Duration::ZERO,
            bank_decision_delay: Duration::ZERO,
            dedup_window: 4096,
            parties: Party::ALL.to_vec(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parses a comma-separated party list. Unknown names invalidate the whole list.
fn parse_parties(value: &str) -> Option<Vec<Party>> {
    let parties = value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Party>, _>>()
        .ok()?;
    (!parties.is_empty()).then_some(parties)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = SagaConfig::default();
        assert_eq!(config.worker_concurrency, 16);
        assert_eq!(config.credit_decision_delay, Duration::ZERO);
        assert_eq!(config.dedup_window, 4096);
        for party in Party::ALL {
            assert!(config.runs(party));
        }
    }

    #[test]
    fn test_parse_parties() {
        assert_eq!(
            parse_parties("FINANCE_AGENCY, bank"),
            Some(vec![Party::FinanceAgency, Party::Bank])
        );
        assert_eq!(parse_parties("bank,insurer"), None);
        assert_eq!(parse_parties(" , "), None);
    }

    #[test]
    fn test_builders() {
        let config = SagaConfig::default()
            .with_worker_concurrency(2)
            .with_decision_delays(Duration::from_millis(5), Duration::from_millis(7))
            .with_parties(vec![Party::Bank]);
        assert_eq!(config.worker_concurrency, 2);
        assert_eq!(config.bank_decision_delay, Duration::from_millis(7));
        assert!(config.runs(Party::Bank));
        assert!(!config.runs(Party::FinanceAgency));
    }
}

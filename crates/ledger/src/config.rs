//! Ledger configuration loaded from environment variables.

use std::time::Duration;

/// Settings for the in-memory ledger.
///
/// Reads from environment variables:
/// - `LEDGER_SIGNATURE_TIMEOUT_MS` — bounded wait for each counterparty signature (default: `30000`)
/// - `LEDGER_SIGNING_LATENCY_MS` — simulated round trip per signature request (default: `0`)
/// - `LEDGER_FEED_CAPACITY` — change-feed buffer per subscriber (default: `1024`)
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub signature_timeout: Duration,
    pub signing_latency: Duration,
    pub feed_capacity: usize,
}

impl LedgerConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            signature_timeout: env_millis("LEDGER_SIGNATURE_TIMEOUT_MS")
                .unwrap_or(defaults.signature_timeout),
            signing_latency: env_millis("LEDGER_SIGNING_LATENCY_MS")
                .unwrap_or(defaults.signing_latency),
            feed_capacity: std::env::var("LEDGER_FEED_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|c| *c > 0)
                .unwrap_or(defaults.feed_capacity),
        }
    }

    /// Overrides the signature timeout.
    pub fn with_signature_timeout(mut self, timeout: Duration) -> Self {
        self.signature_timeout = timeout;
        self
    }

    /// Overrides the simulated signing latency.
    pub fn with_signing_latency(mut self, latency: Duration) -> Self {
        self.signing_latency = latency;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            signature_timeout: Duration::from_secs(30),
            signing_latency: Duration::ZERO,
            feed_capacity: 1024,
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = LedgerConfig::default();
        assert_eq!(config.signature_timeout, Duration::from_secs(30));
        assert_eq!(config.signing_latency, Duration::ZERO);
        assert_eq!(config.feed_capacity, 1024);
    }

    #[test]
    fn test_overrides() {
        let config = LedgerConfig::default()
            .with_signature_timeout(Duration::from_millis(50))
            .with_signing_latency(Duration::from_millis(5));
        assert_eq!(config.signature_timeout, Duration::from_millis(50));
        assert_eq!(config.signing_latency, Duration::from_millis(5));
    }
}

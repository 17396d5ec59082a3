//! Node configuration loaded from environment variables.

use ledger::LedgerConfig;
use saga::SagaConfig;

/// Node configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `"json"` for JSON lines, anything else for text (default: text)
/// - `METRICS_ADDR` — Prometheus scrape listener (default: `"0.0.0.0:9000"`)
/// - `DEMO_APPLICATIONS` — applications submitted at startup (default: `1`)
/// - `DEMO_COMPANY`, `DEMO_BUSINESS_TYPE`, `DEMO_LOAN_AMOUNT` — their terms
///
/// Ledger and saga settings come from [`LedgerConfig::from_env`] and
/// [`SagaConfig::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub json_logs: bool,
    pub metrics_addr: String,
    pub demo_applications: usize,
    pub demo_company: String,
    pub demo_business_type: String,
    pub demo_loan_amount: i64,
    pub ledger: LedgerConfig,
    pub saga: SagaConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            json_logs: std::env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.json_logs),
            metrics_addr: std::env::var("METRICS_ADDR").unwrap_or(defaults.metrics_addr),
            demo_applications: std::env::var("DEMO_APPLICATIONS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.demo_applications),
            demo_company: std::env::var("DEMO_COMPANY").unwrap_or(defaults.demo_company),
            demo_business_type: std::env::var("DEMO_BUSINESS_TYPE")
                .unwrap_or(defaults.demo_business_type),
            demo_loan_amount: std::env::var("DEMO_LOAN_AMOUNT")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.demo_loan_amount),
            ledger: LedgerConfig::from_env(),
            saga: SagaConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_addr: "0.0.0.0:9000".to_string(),
            demo_applications: 1,
            demo_company: "Acme Corp".to_string(),
            demo_business_type: "Retail".to_string(),
            demo_loan_amount: 250_000,
            ledger: LedgerConfig::default(),
            saga: SagaConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
        assert_eq!(config.metrics_addr, "0.0.0.0:9000");
        assert_eq!(config.demo_applications, 1);
        assert!(config.demo_loan_amount > 0);
        assert_eq!(config.saga.worker_concurrency, 16);
    }
}

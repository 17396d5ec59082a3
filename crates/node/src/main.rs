//! Node entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use ledger::InMemoryLedger;
use node::{Config, demo};
use saga::{LoanNetwork, RandomCreditScorer, register_parties};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder with its scrape listener
    let metrics_addr: SocketAddr = config
        .metrics_addr
        .parse()
        .expect("METRICS_ADDR must be a socket address");
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .expect("failed to install Prometheus recorder");
    tracing::info!(%metrics_addr, "serving Prometheus metrics");

    // 3. Create the ledger and register every party's signing hook
    let ledger = InMemoryLedger::new(config.ledger.clone());
    register_parties(&ledger).await;

    // 4. Start the observers
    let network = LoanNetwork::start(ledger, config.saga.clone(), Arc::new(RandomCreditScorer))
        .await
        .expect("failed to start loan network");

    // 5. Submit the demo applications
    let loan_ids = match demo::submit_applications(&network, &config).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "demo application rejected");
            Vec::new()
        }
    };

    shutdown_signal().await;

    if let Err(e) = demo::report(&network, &loan_ids).await {
        tracing::error!(error = %e, "failed to report loan progress");
    }
    network.shutdown().await;
    tracing::info!("node shut down gracefully");
}

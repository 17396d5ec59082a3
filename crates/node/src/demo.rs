//! Demo applications submitted at startup and reported at shutdown.

use common::LinearId;
use ledger::Ledger;
use saga::{LoanNetwork, Result};

use crate::config::Config;

/// Submits the configured number of demo applications.
#[tracing::instrument(skip_all, fields(count = config.demo_applications))]
pub async fn submit_applications<L: Ledger + Clone + 'static>(
    network: &LoanNetwork<L>,
    config: &Config,
) -> Result<Vec<LinearId>> {
    let mut loan_ids = Vec::with_capacity(config.demo_applications);
    for i in 0..config.demo_applications {
        let company = if config.demo_applications == 1 {
            config.demo_company.clone()
        } else {
            format!("{} #{}", config.demo_company, i + 1)
        };
        let application = network
            .finance()
            .create_application(&company, &config.demo_business_type, config.demo_loan_amount)
            .await?;
        loan_ids.push(application.record.id);
    }
    Ok(loan_ids)
}

/// Logs where each application stands.
pub async fn report<L: Ledger + Clone + 'static>(
    network: &LoanNetwork<L>,
    loan_ids: &[LinearId],
) -> Result<()> {
    for loan_id in loan_ids {
        match network.finance().progress(*loan_id).await? {
            Some(progress) => tracing::info!(
                %loan_id,
                status = %progress.status(),
                abstract_status = %progress.abstract_status(),
                next_step = ?progress.next_step(),
                "loan progress"
            ),
            None => tracing::warn!(%loan_id, "loan application not found"),
        }
    }
    Ok(())
}

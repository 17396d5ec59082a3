//! The verifier each party registers with the ledger.

use common::Party;
use ledger::{LedgerTransaction, TransactionVerifier};

use crate::loan::LoanContract;

/// Runs the loan contract on behalf of one party before it signs.
///
/// A party also refuses to sign a transaction whose output it does not
/// participate in.
#[derive(Debug, Clone, Copy)]
pub struct PartyVerifier {
    party: Party,
}

impl PartyVerifier {
    pub fn new(party: Party) -> Self {
        Self { party }
    }

    pub fn party(&self) -> Party {
        self.party
    }
}

impl TransactionVerifier for PartyVerifier {
    fn verify(&self, tx: &LedgerTransaction) -> Result<(), String> {
        let party = self.party.as_str();

        if let Err(e) = LoanContract::verify(tx) {
            metrics::counter!("contract_rejections_total", "party" => party).increment(1);
            tracing::warn!(tx_id = %tx.tx_id, party, error = %e, "refusing to sign transaction");
            return Err(e.to_string());
        }

        if !tx.outputs.iter().any(|s| s.has_participant(self.party)) {
            metrics::counter!("contract_rejections_total", "party" => party).increment(1);
            tracing::warn!(tx_id = %tx.tx_id, party, "refusing to sign transaction without a stake");
            return Err(format!("{} has no stake in this transaction", self.party));
        }

        tracing::debug!(tx_id = %tx.tx_id, party, "transaction verified");
        Ok(())
    }
}

use crate::LedgerTransaction;

/// Local verification a party runs before signing a transaction.
///
/// Implementations must be pure: the same transaction always yields the same
/// verdict. The error string is the human-readable rejection reason.
pub trait TransactionVerifier: Send + Sync {
    fn verify(&self, tx: &LedgerTransaction) -> Result<(), String>;
}

impl<F> TransactionVerifier for F
where
    F: Fn(&LedgerTransaction) -> Result<(), String> + Send + Sync,
{
    fn verify(&self, tx: &LedgerTransaction) -> Result<(), String> {
        self(tx)
    }
}

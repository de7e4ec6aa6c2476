use crate::{
    db_types::{Kobo, NewPendingTransaction, PendingTransaction, Reference},
    vault_api::errors::LedgerError,
};

/// The storage boundary for funding attempts.
///
/// Balances are mutated *only* as a side effect of [`LedgerGateway::mark_successful_and_credit`]. Implementations
/// must make both `mark_*` methods a single atomic conditional update on the transaction's status: two concurrent
/// deliveries of the same webhook must never both observe `PENDING`. A read followed by a write in application code
/// does not satisfy this contract.
#[allow(async_fn_in_trait)]
pub trait LedgerGateway {
    /// Stores a new transaction with status `PENDING`. No balance is touched.
    ///
    /// Fails with [`LedgerError::DuplicateReference`] if the reference has been used before, and with
    /// [`LedgerError::PlanNotFound`] if the plan does not exist or does not belong to the user.
    async fn insert_pending_transaction(&self, tx: NewPendingTransaction) -> Result<PendingTransaction, LedgerError>;

    /// Fetches the transaction with the given reference, if one was ever recorded.
    async fn fetch_transaction_by_reference(
        &self,
        reference: &Reference,
    ) -> Result<Option<PendingTransaction>, LedgerError>;

    /// Moves the transaction from `PENDING` to `SUCCESSFUL` and adds `amount` to the balance of the account it
    /// targets, in one atomic step.
    ///
    /// Returns `false` (and changes nothing) if the transaction was no longer `PENDING`.
    async fn mark_successful_and_credit(&self, reference: &Reference, amount: Kobo) -> Result<bool, LedgerError>;

    /// Moves the transaction from `PENDING` to `FAILED`. Returns `false` if it was no longer `PENDING`.
    async fn mark_failed(&self, reference: &Reference) -> Result<bool, LedgerError>;
}

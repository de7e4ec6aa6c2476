use crate::{
    db_types::{AccountBalances, FamilyVaultPlan, NewSavingsPlan, PendingTransaction, TargetSavingsPlan},
    vault_api::errors::AccountApiError,
};

/// The `AccountManagement` trait provides read access to a user's money, and the bookkeeping needed to set up the
/// savings plans that funding attempts can target.
///
/// Nothing in here may change a balance. That is the job of [`crate::LedgerGateway`].
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Fetches the savings, loan and investment balances for the user. If the user has no accounts, `None` is
    /// returned.
    async fn fetch_balances(&self, user_id: i64) -> Result<Option<AccountBalances>, AccountApiError>;

    /// All funding attempts made by the user, most recent first.
    async fn fetch_transactions_for_user(&self, user_id: i64) -> Result<Vec<PendingTransaction>, AccountApiError>;

    /// Creates a family vault plan with a zero balance. The creator becomes its first member.
    async fn create_family_vault_plan(&self, creator_id: i64, plan: NewSavingsPlan) -> Result<i64, AccountApiError>;

    /// Adds a member to a family vault plan. Adding an existing member is a no-op.
    async fn add_family_vault_member(&self, plan_id: i64, user_id: i64) -> Result<(), AccountApiError>;

    async fn fetch_family_vault_plans(&self, user_id: i64) -> Result<Vec<FamilyVaultPlan>, AccountApiError>;

    /// Creates a target savings plan with a zero balance, owned by `user_id`.
    async fn create_target_savings_plan(&self, user_id: i64, plan: NewSavingsPlan) -> Result<i64, AccountApiError>;

    async fn fetch_target_savings_plans(&self, user_id: i64) -> Result<Vec<TargetSavingsPlan>, AccountApiError>;
}

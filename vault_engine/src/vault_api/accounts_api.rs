//! Read access to balances and transactions, and savings plan bookkeeping.

use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::AccountManagement,
    db_types::{AccountBalances, FamilyVaultPlan, NewSavingsPlan, PendingTransaction, TargetSavingsPlan},
    vault_api::errors::AccountApiError,
};

/// The `AccountApi` is everything the dashboard needs. None of it can change a balance.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The user's balances. Fails with [`AccountApiError::UserNotFound`] if the user does not exist.
    pub async fn balances(&self, user_id: i64) -> Result<AccountBalances, AccountApiError> {
        self.db.fetch_balances(user_id).await?.ok_or(AccountApiError::UserNotFound(user_id))
    }

    pub async fn transactions(&self, user_id: i64) -> Result<Vec<PendingTransaction>, AccountApiError> {
        self.db.fetch_transactions_for_user(user_id).await
    }

    pub async fn family_vault_plans(&self, user_id: i64) -> Result<Vec<FamilyVaultPlan>, AccountApiError> {
        self.db.fetch_family_vault_plans(user_id).await
    }

    pub async fn create_family_vault_plan(&self, creator_id: i64, plan: NewSavingsPlan) -> Result<i64, AccountApiError> {
        let plan = validate_plan(plan)?;
        if plan.goal.is_some() {
            return Err(AccountApiError::InvalidPlan("Family vault plans do not have a goal".into()));
        }
        let id = self.db.create_family_vault_plan(creator_id, plan).await?;
        info!("📒️ User #{creator_id} created family vault plan #{id}");
        Ok(id)
    }

    /// Adds `new_member` to a family vault plan. Only existing members may do this.
    pub async fn add_family_vault_member(
        &self,
        requester_id: i64,
        plan_id: i64,
        new_member: i64,
    ) -> Result<(), AccountApiError> {
        let is_member = self.db.fetch_family_vault_plans(requester_id).await?.iter().any(|p| p.id == plan_id);
        if !is_member {
            return Err(AccountApiError::PlanNotFound(plan_id));
        }
        self.db.add_family_vault_member(plan_id, new_member).await?;
        info!("📒️ User #{requester_id} added user #{new_member} to family vault plan #{plan_id}");
        Ok(())
    }

    pub async fn target_savings_plans(&self, user_id: i64) -> Result<Vec<TargetSavingsPlan>, AccountApiError> {
        self.db.fetch_target_savings_plans(user_id).await
    }

    pub async fn create_target_savings_plan(&self, user_id: i64, plan: NewSavingsPlan) -> Result<i64, AccountApiError> {
        let plan = validate_plan(plan)?;
        match plan.goal {
            Some(goal) if goal.is_positive() => {},
            _ => return Err(AccountApiError::InvalidPlan("Target savings plans need a positive goal".into())),
        }
        let id = self.db.create_target_savings_plan(user_id, plan).await?;
        info!("📒️ User #{user_id} created target savings plan #{id}");
        Ok(id)
    }
}

fn validate_plan(mut plan: NewSavingsPlan) -> Result<NewSavingsPlan, AccountApiError> {
    plan.name = plan.name.trim().to_string();
    plan.description = plan.description.trim().to_string();
    if plan.name.is_empty() {
        return Err(AccountApiError::InvalidPlan("Plans need a name".into()));
    }
    Ok(plan)
}

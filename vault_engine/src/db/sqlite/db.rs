use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{accounts, credentials, db_url, new_pool, transactions, SqliteDatabaseError};
use crate::{
    db::traits::{AccountManagement, CredentialStore, LedgerGateway},
    db_types::{
        AccountBalances,
        FamilyVaultPlan,
        Kobo,
        NewPendingTransaction,
        NewSavingsPlan,
        NewUser,
        PendingTransaction,
        Reference,
        TargetSavingsPlan,
        UserCredentials,
    },
    vault_api::errors::{AccountApiError, AuthApiError, LedgerError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the `VAULT_DATABASE_URL` environment variable (or the default).
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), SqliteDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

impl LedgerGateway for SqliteDatabase {
    async fn insert_pending_transaction(&self, tx: NewPendingTransaction) -> Result<PendingTransaction, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        transactions::validate_plan(&tx, &mut conn).await?;
        let result = transactions::insert_pending(tx, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_transaction_by_reference(
        &self,
        reference: &Reference,
    ) -> Result<Option<PendingTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let result = transactions::fetch_by_reference(reference, &mut conn).await?;
        Ok(result)
    }

    async fn mark_successful_and_credit(&self, reference: &Reference, amount: Kobo) -> Result<bool, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(SqliteDatabaseError::from)?;
        let Some(target) = transactions::mark_successful(reference, amount, &mut tx).await? else {
            trace!("🗃️ Transaction {reference} is not pending. Nothing to credit.");
            return Ok(false);
        };
        transactions::credit_account(target, amount, &mut tx).await?;
        tx.commit().await.map_err(SqliteDatabaseError::from)?;
        debug!("🗃️ Transaction {reference} marked successful and {amount} credited");
        Ok(true)
    }

    async fn mark_failed(&self, reference: &Reference) -> Result<bool, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let updated = transactions::mark_failed(reference, &mut conn).await?;
        if updated {
            debug!("🗃️ Transaction {reference} marked as failed");
        }
        Ok(updated)
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_balances(&self, user_id: i64) -> Result<Option<AccountBalances>, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let result = accounts::fetch_balances(user_id, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_transactions_for_user(&self, user_id: i64) -> Result<Vec<PendingTransaction>, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let result = transactions::fetch_for_user(user_id, &mut conn).await?;
        Ok(result)
    }

    async fn create_family_vault_plan(&self, creator_id: i64, plan: NewSavingsPlan) -> Result<i64, AccountApiError> {
        let mut tx = self.pool.begin().await.map_err(SqliteDatabaseError::from)?;
        let id = accounts::create_family_vault_plan(creator_id, plan, &mut tx).await?;
        tx.commit().await.map_err(SqliteDatabaseError::from)?;
        Ok(id)
    }

    async fn add_family_vault_member(&self, plan_id: i64, user_id: i64) -> Result<(), AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        accounts::add_family_vault_member(plan_id, user_id, &mut conn).await?;
        Ok(())
    }

    async fn fetch_family_vault_plans(&self, user_id: i64) -> Result<Vec<FamilyVaultPlan>, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let result = accounts::fetch_family_vault_plans(user_id, &mut conn).await?;
        Ok(result)
    }

    async fn create_target_savings_plan(&self, user_id: i64, plan: NewSavingsPlan) -> Result<i64, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let id = accounts::create_target_savings_plan(user_id, plan, &mut conn).await?;
        Ok(id)
    }

    async fn fetch_target_savings_plans(&self, user_id: i64) -> Result<Vec<TargetSavingsPlan>, AccountApiError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let result = accounts::fetch_target_savings_plans(user_id, &mut conn).await?;
        Ok(result)
    }
}

impl CredentialStore for SqliteDatabase {
    async fn fetch_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AuthApiError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let result = credentials::fetch_credentials(email, &mut conn).await?;
        Ok(result)
    }

    async fn insert_user(&self, user: NewUser) -> Result<i64, AuthApiError> {
        let mut tx = self.pool.begin().await.map_err(SqliteDatabaseError::from)?;
        let id = credentials::insert_user(user, &mut tx).await?;
        tx.commit().await.map_err(SqliteDatabaseError::from)?;
        Ok(id)
    }

    async fn mark_email_verified(&self, user_id: i64) -> Result<(), AuthApiError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        credentials::mark_email_verified(user_id, &mut conn).await?;
        Ok(())
    }

    async fn grant_admin(&self, user_id: i64) -> Result<(), AuthApiError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        credentials::grant_admin(user_id, &mut conn).await?;
        Ok(())
    }
}

use log::*;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{AccountBalances, FamilyVaultPlan, NewSavingsPlan, TargetSavingsPlan},
};

/// Creates the zero-balance solo savings, loans and investment accounts for a new user.
pub async fn open_accounts_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query("INSERT INTO solo_savings_accounts (customer_id) VALUES (?)").bind(user_id).execute(&mut *conn).await?;
    sqlx::query("INSERT INTO loans_accounts (customer_id) VALUES (?)").bind(user_id).execute(&mut *conn).await?;
    sqlx::query("INSERT INTO investment_accounts (customer_id) VALUES (?)").bind(user_id).execute(conn).await?;
    trace!("🗃️ Opened balance accounts for user #{user_id}");
    Ok(())
}

pub async fn fetch_balances(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<AccountBalances>, SqliteDatabaseError> {
    let balances = sqlx::query_as(
        r#"SELECT c.id AS user_id,
            COALESCE(s.balance_in_k, 0) AS savings,
            COALESCE(l.amount_owed_in_k, 0) AS loans,
            COALESCE(i.balance_in_k, 0) AS investment
        FROM customers c
            LEFT JOIN solo_savings_accounts s ON s.customer_id = c.id
            LEFT JOIN loans_accounts l ON l.customer_id = c.id
            LEFT JOIN investment_accounts i ON i.customer_id = c.id
        WHERE c.id = ?"#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(balances)
}

async fn user_exists(user_id: i64, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE id = ?").bind(user_id).fetch_one(conn).await?;
    Ok(count > 0)
}

/// Creates a family vault plan. The creator becomes its first member.
pub async fn create_family_vault_plan(
    creator_id: i64,
    plan: NewSavingsPlan,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    if !user_exists(creator_id, &mut *conn).await? {
        return Err(SqliteDatabaseError::UserNotFound(creator_id));
    }
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO family_vault_plans (creator_id, name, description) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(creator_id)
    .bind(&plan.name)
    .bind(&plan.description)
    .fetch_one(&mut *conn)
    .await?;
    add_family_vault_member(id, creator_id, conn).await?;
    debug!("🗃️ Family vault plan #{id} ({}) created by user #{creator_id}", plan.name);
    Ok(id)
}

/// Adds a member to a family vault plan. Adding an existing member again is a no-op.
pub async fn add_family_vault_member(
    plan_id: i64,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let plans: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM family_vault_plans WHERE id = ?").bind(plan_id).fetch_one(&mut *conn).await?;
    if plans == 0 {
        return Err(SqliteDatabaseError::PlanDoesNotExist(plan_id));
    }
    if !user_exists(user_id, &mut *conn).await? {
        return Err(SqliteDatabaseError::UserNotFound(user_id));
    }
    sqlx::query("INSERT OR IGNORE INTO family_vault_plan_members (plan_id, customer_id) VALUES (?, ?)")
        .bind(plan_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_family_vault_plans(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<FamilyVaultPlan>, SqliteDatabaseError> {
    let plans = sqlx::query_as(
        r#"SELECT p.id, p.creator_id, p.name, p.description, p.balance_in_k AS balance, p.created_at,
            (SELECT COUNT(*) FROM family_vault_plan_members pm WHERE pm.plan_id = p.id) AS number_of_members
        FROM family_vault_plans p
            JOIN family_vault_plan_members m ON m.plan_id = p.id
        WHERE m.customer_id = ?
        ORDER BY p.id"#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(plans)
}

pub async fn create_target_savings_plan(
    user_id: i64,
    plan: NewSavingsPlan,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    if !user_exists(user_id, &mut *conn).await? {
        return Err(SqliteDatabaseError::UserNotFound(user_id));
    }
    let goal = plan.goal.unwrap_or_default();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO target_savings_plans (customer_id, name, description, goal_in_k) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(user_id)
    .bind(&plan.name)
    .bind(&plan.description)
    .bind(goal.value())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Target savings plan #{id} ({}, goal {goal}) created for user #{user_id}", plan.name);
    Ok(id)
}

pub async fn fetch_target_savings_plans(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<TargetSavingsPlan>, SqliteDatabaseError> {
    let plans = sqlx::query_as(
        r#"SELECT id, customer_id AS user_id, name, description, balance_in_k AS balance, goal_in_k AS goal, created_at
        FROM target_savings_plans
        WHERE customer_id = ?
        ORDER BY id"#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(plans)
}

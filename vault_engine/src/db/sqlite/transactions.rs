use chrono::{DateTime, Utc};
use log::*;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Kobo, NewPendingTransaction, PaymentOriginator, PendingTransaction, Reference, PLAN_SENTINEL_ID},
};

const TRANSACTION_COLUMNS: &str = r#"id, customer_id AS user_id, plan_id, reference, originator, amount_in_k,
    verification_status, fulfillment_status, credited_amount_in_k, created_at, verified_at"#;

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: i64,
    user_id: i64,
    plan_id: i64,
    reference: String,
    originator: String,
    amount_in_k: i64,
    verification_status: String,
    fulfillment_status: String,
    credited_amount_in_k: Option<i64>,
    created_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for PendingTransaction {
    type Error = SqliteDatabaseError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let bad = |e: crate::db_types::ConversionError| SqliteDatabaseError::QueryError(e.to_string());
        Ok(PendingTransaction {
            id: row.id,
            user_id: row.user_id,
            plan_id: row.plan_id,
            reference: row.reference.parse().map_err(bad)?,
            originator: row.originator.parse().map_err(bad)?,
            amount: Kobo::from(row.amount_in_k),
            verification_status: row.verification_status.parse().map_err(bad)?,
            fulfillment_status: row.fulfillment_status.parse().map_err(bad)?,
            credited_amount: row.credited_amount_in_k.map(Kobo::from),
            created_at: row.created_at,
            verified_at: row.verified_at,
        })
    }
}

/// The account a successful payment lands in, as recorded when the transaction was opened.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct CreditTarget {
    pub user_id: i64,
    pub plan_id: i64,
    #[sqlx(try_from = "String")]
    pub originator: PaymentOriginator,
}

/// Checks that the user may direct funds at the given plan.
///
/// Solo savings must carry the sentinel plan id. Family vault payments require membership of the plan, and target
/// savings payments require ownership.
pub async fn validate_plan(tx: &NewPendingTransaction, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let found = match tx.originator {
        PaymentOriginator::SoloSavings => tx.plan_id == PLAN_SENTINEL_ID,
        PaymentOriginator::FamilySavings => {
            let members: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM family_vault_plan_members WHERE plan_id = ? AND customer_id = ?",
            )
            .bind(tx.plan_id)
            .bind(tx.user_id)
            .fetch_one(conn)
            .await?;
            members > 0
        },
        PaymentOriginator::TargetSavings => {
            let owned: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM target_savings_plans WHERE id = ? AND customer_id = ?")
                    .bind(tx.plan_id)
                    .bind(tx.user_id)
                    .fetch_one(conn)
                    .await?;
            owned > 0
        },
    };
    if found {
        Ok(())
    } else {
        Err(SqliteDatabaseError::PlanNotFound { plan_id: tx.plan_id, user_id: tx.user_id, originator: tx.originator })
    }
}

/// Inserts a new PENDING transaction. A second insert with the same reference fails with
/// [`SqliteDatabaseError::DuplicateReference`] and leaves the first row untouched.
pub async fn insert_pending(
    tx: NewPendingTransaction,
    conn: &mut SqliteConnection,
) -> Result<PendingTransaction, SqliteDatabaseError> {
    let reference = tx.reference.to_string();
    let sql = format!(
        "INSERT INTO pending_transactions (customer_id, plan_id, reference, originator, amount_in_k) VALUES (?, ?, ?, \
         ?, ?) RETURNING {TRANSACTION_COLUMNS}"
    );
    let result = sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(tx.user_id)
        .bind(tx.plan_id)
        .bind(&reference)
        .bind(tx.originator.to_string())
        .bind(tx.amount.value())
        .fetch_one(conn)
        .await;
    match result {
        Ok(row) => {
            debug!("🗃️ Pending transaction {reference} saved with id {}", row.id);
            row.try_into()
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(SqliteDatabaseError::DuplicateReference(tx.reference))
        },
        Err(e) => Err(SqliteDatabaseError::from(e)),
    }
}

pub async fn fetch_by_reference(
    reference: &Reference,
    conn: &mut SqliteConnection,
) -> Result<Option<PendingTransaction>, SqliteDatabaseError> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM pending_transactions WHERE reference = ?");
    let row = sqlx::query_as::<_, TransactionRow>(&sql).bind(reference.to_string()).fetch_optional(conn).await?;
    row.map(PendingTransaction::try_from).transpose()
}

pub async fn fetch_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PendingTransaction>, SqliteDatabaseError> {
    let sql =
        format!("SELECT {TRANSACTION_COLUMNS} FROM pending_transactions WHERE customer_id = ? ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, TransactionRow>(&sql).bind(user_id).fetch_all(conn).await?;
    rows.into_iter().map(PendingTransaction::try_from).collect()
}

/// Moves a PENDING transaction to SUCCESSFUL, recording the credited amount.
///
/// The status check and the update are a single statement, so of any number of concurrent callers for the same
/// reference at most one gets `Some` back. Callers must credit the returned target inside the same database
/// transaction.
pub async fn mark_successful(
    reference: &Reference,
    amount: Kobo,
    conn: &mut SqliteConnection,
) -> Result<Option<CreditTarget>, SqliteDatabaseError> {
    let target = sqlx::query_as::<_, CreditTarget>(
        r#"UPDATE pending_transactions
        SET verification_status = 'SUCCESSFUL', fulfillment_status = 'SUCCESSFUL', credited_amount_in_k = ?,
            verified_at = CURRENT_TIMESTAMP
        WHERE reference = ? AND verification_status = 'PENDING'
        RETURNING customer_id AS user_id, plan_id, originator"#,
    )
    .bind(amount.value())
    .bind(reference.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(target)
}

/// Moves a PENDING transaction to FAILED. Returns false if the transaction was not pending (or does not exist).
pub async fn mark_failed(reference: &Reference, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"UPDATE pending_transactions
        SET verification_status = 'FAILED', fulfillment_status = 'FAILED', verified_at = CURRENT_TIMESTAMP
        WHERE reference = ? AND verification_status = 'PENDING'"#,
    )
    .bind(reference.to_string())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Adds `amount` to the balance the target points at. Fails, leaving the balance alone, if the sum does not fit in an
/// `i64`. Call this inside the transaction that resolved the payment, which already holds the write lock.
pub async fn credit_account(
    target: CreditTarget,
    amount: Kobo,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let not_found = || SqliteDatabaseError::AccountNotFound {
        originator: target.originator,
        user_id: target.user_id,
        plan_id: target.plan_id,
    };
    let current = fetch_credit_balance(&target, conn).await?.ok_or_else(not_found)?;
    let new_balance = current.checked_add(amount.value()).ok_or_else(|| {
        error!(
            "🗃️ Crediting {amount} to {} account of user #{} (plan #{}) would overflow the balance of {current} kobo",
            target.originator, target.user_id, target.plan_id
        );
        SqliteDatabaseError::BalanceOverflow {
            originator: target.originator,
            user_id: target.user_id,
            plan_id: target.plan_id,
        }
    })?;
    let query = match target.originator {
        PaymentOriginator::SoloSavings => sqlx::query(
            "UPDATE solo_savings_accounts SET balance_in_k = ?, updated_at = CURRENT_TIMESTAMP WHERE customer_id = ?",
        )
        .bind(new_balance)
        .bind(target.user_id),
        PaymentOriginator::FamilySavings => {
            sqlx::query("UPDATE family_vault_plans SET balance_in_k = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
                .bind(new_balance)
                .bind(target.plan_id)
        },
        PaymentOriginator::TargetSavings => sqlx::query(
            "UPDATE target_savings_plans SET balance_in_k = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND \
             customer_id = ?",
        )
        .bind(new_balance)
        .bind(target.plan_id)
        .bind(target.user_id),
    };
    let result = query.execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    debug!("🗃️ Credited {amount} to {} account of user #{} (plan #{})", target.originator, target.user_id, target.plan_id);
    Ok(())
}

async fn fetch_credit_balance(
    target: &CreditTarget,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, SqliteDatabaseError> {
    let query = match target.originator {
        PaymentOriginator::SoloSavings => {
            sqlx::query_scalar("SELECT balance_in_k FROM solo_savings_accounts WHERE customer_id = ?")
                .bind(target.user_id)
        },
        PaymentOriginator::FamilySavings => {
            sqlx::query_scalar("SELECT balance_in_k FROM family_vault_plans WHERE id = ?").bind(target.plan_id)
        },
        PaymentOriginator::TargetSavings => {
            sqlx::query_scalar("SELECT balance_in_k FROM target_savings_plans WHERE id = ? AND customer_id = ?")
                .bind(target.plan_id)
                .bind(target.user_id)
        },
    };
    let balance = query.fetch_optional(conn).await?;
    Ok(balance)
}

use log::*;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::{accounts, SqliteDatabaseError},
    db_types::{NewUser, UserCredentials},
};

pub async fn fetch_credentials(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<UserCredentials>, SqliteDatabaseError> {
    let creds = sqlx::query_as(
        r#"SELECT c.id AS user_id, c.email, p.hash AS password_hash,
            EXISTS (SELECT 1 FROM admins a WHERE a.customer_id = c.id) AS is_admin,
            c.email_is_verified AS email_verified
        FROM customers c
            JOIN password_hashes p ON p.customer_id = c.id
        WHERE c.email = ?"#,
    )
    .bind(email)
    .fetch_optional(conn)
    .await?;
    Ok(creds)
}

/// Inserts the customer, their password hash and their empty balance accounts. Call inside a transaction.
pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let result = sqlx::query_scalar::<_, i64>(
        "INSERT INTO customers (first_name, last_name, email) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .fetch_one(&mut *conn)
    .await;
    let id = match result {
        Ok(id) => id,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => return Err(SqliteDatabaseError::DuplicateEmail),
        Err(e) => return Err(e.into()),
    };
    sqlx::query("INSERT INTO password_hashes (customer_id, hash) VALUES (?, ?)")
        .bind(id)
        .bind(&user.password_hash)
        .execute(&mut *conn)
        .await?;
    accounts::open_accounts_for_user(id, conn).await?;
    debug!("🗃️ New user #{id} registered");
    Ok(id)
}

pub async fn mark_email_verified(user_id: i64, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE customers SET email_is_verified = TRUE, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(SqliteDatabaseError::UserNotFound(user_id));
    }
    Ok(())
}

/// Grants the admin role. Granting it twice is a no-op.
pub async fn grant_admin(user_id: i64, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE id = ?").bind(user_id).fetch_one(&mut *conn).await?;
    if count == 0 {
        return Err(SqliteDatabaseError::UserNotFound(user_id));
    }
    sqlx::query("INSERT OR IGNORE INTO admins (customer_id) VALUES (?)").bind(user_id).execute(conn).await?;
    info!("🗃️ User #{user_id} has been granted the admin role");
    Ok(())
}

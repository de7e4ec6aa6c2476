use thiserror::Error;

use crate::{
    db_types::{PaymentOriginator, Reference},
    vault_api::errors::{AccountApiError, AuthApiError, LedgerError},
};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Cannot record duplicate transaction {0}")]
    DuplicateReference(Reference),
    #[error("Plan #{plan_id} is not available to user #{user_id} for {originator} payments")]
    PlanNotFound { plan_id: i64, user_id: i64, originator: PaymentOriginator },
    #[error("No {originator} account found to credit for user #{user_id}, plan #{plan_id}")]
    AccountNotFound { originator: PaymentOriginator, user_id: i64, plan_id: i64 },
    #[error("Crediting the {originator} account of user #{user_id}, plan #{plan_id} would overflow its balance")]
    BalanceOverflow { originator: PaymentOriginator, user_id: i64, plan_id: i64 },
    #[error("Email address is already registered")]
    DuplicateEmail,
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("Plan #{0} does not exist")]
    PlanDoesNotExist(i64),
}

impl From<SqliteDatabaseError> for LedgerError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DuplicateReference(r) => LedgerError::DuplicateReference(r),
            SqliteDatabaseError::PlanNotFound { plan_id, user_id, originator } => {
                LedgerError::PlanNotFound { plan_id, user_id, originator }
            },
            e @ (SqliteDatabaseError::QueryError(_) |
            SqliteDatabaseError::AccountNotFound { .. } |
            SqliteDatabaseError::BalanceOverflow { .. }) => {
                LedgerError::InvalidTransaction(e.to_string())
            },
            e => LedgerError::DatabaseError(e.to_string()),
        }
    }
}

impl From<SqliteDatabaseError> for AccountApiError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::UserNotFound(id) => AccountApiError::UserNotFound(id),
            SqliteDatabaseError::PlanDoesNotExist(id) => AccountApiError::PlanNotFound(id),
            e => AccountApiError::DatabaseError(e.to_string()),
        }
    }
}

impl From<SqliteDatabaseError> for AuthApiError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DuplicateEmail => AuthApiError::EmailAlreadyRegistered,
            SqliteDatabaseError::UserNotFound(id) => AuthApiError::UserNotFound(id),
            e => AuthApiError::DatabaseError(e.to_string()),
        }
    }
}

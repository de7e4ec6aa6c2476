use thiserror::Error;

use crate::{
    db_types::{PaymentOriginator, Reference},
    webhook::WebhookError,
};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A transaction with reference {0} already exists")]
    DuplicateReference(Reference),
    #[error("Plan #{plan_id} does not exist or is not available to user #{user_id} for {originator} payments")]
    PlanNotFound { plan_id: i64, user_id: i64, originator: PaymentOriginator },
    #[error("Stored transaction data is invalid: {0}")]
    InvalidTransaction(String),
}

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No account exists for that email address")]
    AccountDoesNotExist,
    #[error("The email address has not been verified")]
    EmailNotVerified,
    #[error("The password is incorrect")]
    PasswordIncorrect,
    #[error("The email address is already registered")]
    EmailAlreadyRegistered,
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("Could not hash password: {0}")]
    PasswordHashError(String),
    #[error("Invalid registration details: {0}")]
    InvalidRegistration(String),
}

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Plan #{0} does not exist")]
    PlanNotFound(i64),
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("Invalid plan details: {0}")]
    InvalidPlan(String),
}

/// Failures of the reconciliation engine. Only a handful of these should ever reach the payment processor as a
/// non-2xx response; see [`ReconciliationError::is_retryable`].
#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error(transparent)]
    Webhook(#[from] WebhookError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Funding amounts must be positive")]
    InvalidAmount,
}

impl ReconciliationError {
    /// True if the processor should retry delivery. Only an unreachable ledger qualifies; every other failure will
    /// fail again in exactly the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconciliationError::Ledger(LedgerError::DatabaseError(_)))
    }
}

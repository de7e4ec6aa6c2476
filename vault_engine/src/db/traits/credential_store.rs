use crate::{
    db_types::{NewUser, UserCredentials},
    vault_api::errors::AuthApiError,
};

/// Storage for users and their password hashes.
///
/// The store never sees a plaintext password. Hashing and verification happen in [`crate::AuthApi`].
#[allow(async_fn_in_trait)]
pub trait CredentialStore {
    /// Fetches the credentials for the given (already lower-cased) email address.
    async fn fetch_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AuthApiError>;

    /// Creates the user, their password hash, and zero-balance savings, loan and investment accounts in one atomic
    /// step. Returns the new user id. Fails with [`AuthApiError::EmailAlreadyRegistered`] if the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<i64, AuthApiError>;

    /// Marks the user's email address as verified. Fails with [`AuthApiError::UserNotFound`] for unknown users.
    async fn mark_email_verified(&self, user_id: i64) -> Result<(), AuthApiError>;

    /// Gives the user the admin role. This must be idempotent.
    async fn grant_admin(&self, user_id: i64) -> Result<(), AuthApiError>;
}

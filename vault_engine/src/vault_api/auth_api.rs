//! User registration and credential checks.
use std::fmt::Debug;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db::traits::CredentialStore,
    db_types::{NewUser, Role},
    vault_api::errors::AuthApiError,
};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Who just logged in. Feed this to [`crate::SessionStore::create_session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
}

#[derive(Clone, Deserialize)]
pub struct NewUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl Debug for NewUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NewUserRequest({} {}, {})", self.first_name, self.last_name, self.email)
    }
}

/// Hashes a password with argon2id and a random salt, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthApiError::PasswordHashError(e.to_string()))?;
    Ok(hash.to_string())
}

/// Checks a password against a stored PHC string. A hash that can't be parsed is an error, not a mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthApiError::PasswordHashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AuthApi<B> {
    db: B,
}

impl<B: Debug> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi ({:?})", self.db)
    }
}

impl<B> AuthApi<B>
where B: CredentialStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Checks an email and password pair. The password is checked before the verification flag so that an unverified
    /// account doesn't reveal itself to someone without the password.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResult, AuthApiError> {
        let email = normalize_email(email);
        let creds = self.db.fetch_credentials(&email).await?.ok_or_else(|| {
            debug!("🔐️ Login attempt for unknown account {email}");
            AuthApiError::AccountDoesNotExist
        })?;
        if !verify_password(password, &creds.password_hash)? {
            debug!("🔐️ Incorrect password for user #{}", creds.user_id);
            return Err(AuthApiError::PasswordIncorrect);
        }
        if !creds.email_verified {
            debug!("🔐️ User #{} has not verified their email address", creds.user_id);
            return Err(AuthApiError::EmailNotVerified);
        }
        let role = if creds.is_admin { Role::Admin } else { Role::Basic };
        info!("🔐️ User #{} logged in with role {role}", creds.user_id);
        Ok(LoginResult { user_id: creds.user_id, email: creds.email, role })
    }

    /// Creates a user along with their empty savings, loans and investment accounts. New users must have their email
    /// verified before they can log in.
    pub async fn register_user(&self, request: NewUserRequest) -> Result<i64, AuthApiError> {
        let email = normalize_email(&request.email);
        let first_name = request.first_name.trim();
        let last_name = request.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(AuthApiError::InvalidRegistration("First and last names are required".into()));
        }
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AuthApiError::InvalidRegistration(format!("'{email}' is not a valid email address")));
        }
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthApiError::InvalidRegistration(format!(
                "Passwords must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }
        let password_hash = hash_password(&request.password)?;
        let user = NewUser { first_name: first_name.to_string(), last_name: last_name.to_string(), email, password_hash };
        let id = self.db.insert_user(user).await?;
        info!("🔐️ Registered new user #{id}");
        Ok(id)
    }

    pub async fn verify_email(&self, user_id: i64) -> Result<(), AuthApiError> {
        self.db.mark_email_verified(user_id).await?;
        info!("🔐️ Email address for user #{user_id} verified");
        Ok(())
    }

    pub async fn grant_admin(&self, user_id: i64) -> Result<(), AuthApiError> {
        self.db.grant_admin(user_id).await
    }
}

//! Vault Engine
//!
//! The engine holds the two parts of the savings vault that have to be right: who is logged in, and how money gets
//! into an account. It knows nothing about HTTP.
//!
//! The library is divided into these sections:
//! 1. Sessions ([`mod@sessions`]). An in-memory [`SessionStore`] with absolute expiry, revocation and role checks.
//! 2. Database management and control (`db`). The [`LedgerGateway`], [`AccountManagement`] and [`CredentialStore`]
//!    traits define what a storage backend must provide. [`SqliteDatabase`] is the supplied backend. The data types
//!    stored in the database live in [`mod@db_types`].
//! 3. Webhook authentication and parsing ([`mod@webhook`]).
//! 4. The public API (`vault_api`). [`ReconciliationApi`] is the only path by which a balance changes. [`AuthApi`] and
//!    [`AccountApi`] cover registration, login, and the read side of the dashboard.
mod db;

pub mod db_types;
pub mod sessions;
mod vault_api;
pub mod webhook;

#[cfg(feature = "test_utils")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{AccountManagement, CredentialStore, LedgerGateway};
pub use sessions::{Session, SessionConfig, SessionCookie, SessionError, SessionStore};
pub use vault_api::{
    accounts_api::AccountApi,
    auth_api::{hash_password, verify_password, AuthApi, LoginResult, NewUserRequest},
    errors::{AccountApiError, AuthApiError, LedgerError, ReconciliationError},
    reconciliation_api::{ReconciliationApi, WebhookAck},
};

//! # Vault engine public API
//!
//! The API is split by concern so that each consumer only needs a backend for the traits it actually uses.
//!
//! * [`reconciliation_api`] records funding intents and applies payment-processor webhooks to them. It is the only
//!   code path that can move money into an account.
//! * [`auth_api`] registers users and checks their credentials. Sessions are minted from its [`LoginResult`] by the
//!   [`crate::SessionStore`].
//! * [`accounts_api`] reads balances and transactions, and sets up the savings plans funding attempts can target.
//!
//! Every API is created the same way, by handing it a database backend:
//!
//! ```rust,ignore
//! use vault_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/vault.db", 5).await?;
//! let api = AccountApi::new(db);
//! let balances = api.balances(42).await?;
//! ```
//!
//! [`LoginResult`]: auth_api::LoginResult

pub mod accounts_api;
pub mod auth_api;
pub mod errors;
pub mod reconciliation_api;

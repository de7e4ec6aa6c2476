//! #  Database management and control.
//!
//! This module defines the interface contracts that database *backends* must honour to support the vault engine.
//!
//! * [`LedgerGateway`] is the only path by which money enters an account. It records funding intents and applies the
//!   processor's verdict on them, exactly once per transaction.
//! * [`AccountManagement`] provides read access to balances and transactions, plus savings plan bookkeeping.
//! * [`CredentialStore`] stores users and their password hashes for the authenticator.
mod account_management;
mod credential_store;
mod ledger_gateway;

pub use account_management::AccountManagement;
pub use credential_store::CredentialStore;
pub use ledger_gateway::LedgerGateway;

//! # Savings vault server
//! The HTTP face of the vault engine. It is responsible for:
//! * Registering users and logging them in and out, using a session cookie.
//! * Recording funding intents for solo savings, family vault and target savings plans.
//! * Receiving Paystack's payment webhooks and handing them to the reconciliation engine.
//! * Serving balances, transactions and savings plans to logged-in users, and a few admin operations.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/auth/register`, `/auth/login`, `/auth/logout`: Account and session management.
//! * `/api/...`: Everything that needs a session. See [routes](routes/index.html).
//! * `/api/paystack-verification-webhook`: The payment processor callback. Authenticated by signature, not by session.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod routes;
pub mod server;
pub mod session;

#[cfg(test)]
mod endpoint_tests;

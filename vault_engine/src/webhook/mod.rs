//! Inbound payment-processor webhooks.
//!
//! Everything here is pure: no I/O, no ledger access. [`verify_signature`] must succeed before [`WebhookEvent::parse`]
//! is given the body.
mod events;
mod signature;

pub use events::{EventKind, PaymentOutcome, WebhookEvent};
pub use signature::{sign_payload, verify_signature, SIGNATURE_HEADER};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("The webhook signature header is missing")]
    MissingSignature,
    #[error("The webhook signature does not match the payload")]
    InvalidSignature,
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),
}

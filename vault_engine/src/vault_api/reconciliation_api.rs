//! Records funding intents and reconciles them against payment-processor webhooks.
//!
//! A webhook is handled in a fixed order: the signature is checked against the raw body, then the envelope is parsed,
//! then the transaction is looked up by reference, and finally the ledger is asked to move it out of `PENDING`. The
//! ledger's conditional update is what makes replays harmless. This module never reads a status and then writes based
//! on it.
use std::fmt::{Debug, Display};

use log::*;
use vault_common::Secret;

use crate::{
    db::traits::LedgerGateway,
    db_types::{Kobo, NewPendingTransaction, PendingTransaction, Reference},
    vault_api::errors::ReconciliationError,
    webhook::{verify_signature, EventKind, WebhookError, WebhookEvent},
};

/// What happened to a signature-verified webhook. Every variant should be acknowledged to the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAck {
    /// The transaction moved to `SUCCESSFUL` and the amount was added to the target account.
    Credited { reference: Reference, amount: Kobo },
    /// The transaction moved to `FAILED`.
    MarkedFailed { reference: Reference },
    /// The transaction had already left `PENDING`. Nothing changed.
    AlreadyResolved { reference: Reference },
    /// No transaction was ever recorded with this reference.
    UnknownReference(Reference),
    /// An event kind we don't act on.
    Ignored(String),
}

impl Display for WebhookAck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookAck::Credited { reference, amount } => write!(f, "credited {amount} for {reference}"),
            WebhookAck::MarkedFailed { reference } => write!(f, "marked {reference} as failed"),
            WebhookAck::AlreadyResolved { reference } => write!(f, "{reference} was already resolved"),
            WebhookAck::UnknownReference(reference) => write!(f, "unknown reference {reference}"),
            WebhookAck::Ignored(tag) => write!(f, "ignored '{tag}' event"),
        }
    }
}

pub struct ReconciliationApi<B> {
    db: B,
    signing_secret: Secret<String>,
}

impl<B: Debug> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({:?})", self.db)
    }
}

impl<B> ReconciliationApi<B>
where B: LedgerGateway
{
    pub fn new(db: B, signing_secret: Secret<String>) -> Self {
        if !signing_secret.is_set() {
            warn!("💳️ The webhook signing secret is empty. Every webhook will be rejected as unsigned until it is set.");
        }
        Self { db, signing_secret }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Records a funding intent as `PENDING`. No balance changes until the processor confirms the payment.
    pub async fn record_pending_transaction(
        &self,
        tx: NewPendingTransaction,
    ) -> Result<PendingTransaction, ReconciliationError> {
        if !tx.amount.is_positive() {
            return Err(ReconciliationError::InvalidAmount);
        }
        let reference = tx.reference;
        let record = self.db.insert_pending_transaction(tx).await?;
        info!(
            "💳️ User #{} opened {} transaction {reference} for {}",
            record.user_id, record.originator, record.amount
        );
        Ok(record)
    }

    pub async fn fetch_transaction(&self, reference: &Reference) -> Result<Option<PendingTransaction>, ReconciliationError> {
        Ok(self.db.fetch_transaction_by_reference(reference).await?)
    }

    /// Applies a payment-processor webhook.
    ///
    /// Returns an error only for bad signatures, unparseable bodies, and ledger failures. Only the last of these is
    /// worth a retry from the processor (see [`ReconciliationError::is_retryable`]).
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<WebhookAck, ReconciliationError> {
        if let Err(e) = verify_signature(raw_body, signature_header, &self.signing_secret) {
            warn!("💳️ Rejecting webhook: {e}");
            return Err(e.into());
        }
        let event = WebhookEvent::parse(raw_body).map_err(|e| {
            warn!("💳️ Signed webhook could not be parsed: {e}");
            e
        })?;
        let outcome = match (&event.kind, event.outcome) {
            (EventKind::Other(tag), _) => {
                debug!("💳️ Ignoring '{tag}' webhook event");
                return Ok(WebhookAck::Ignored(tag.clone()));
            },
            (_, Some(outcome)) => outcome,
            (kind, None) => {
                return Err(WebhookError::MalformedPayload(format!("{kind} event carries no payment data")).into())
            },
        };
        let reference = outcome.reference;
        let Some(tx) = self.db.fetch_transaction_by_reference(&reference).await? else {
            warn!(
                "💳️ SUSPECT TRANSACTION. Received a {} webhook for {reference} ({}), but no such transaction was ever \
                 recorded.",
                event.kind, outcome.amount
            );
            return Ok(WebhookAck::UnknownReference(reference));
        };
        let ack = match event.kind {
            EventKind::Success => {
                if tx.amount != outcome.amount {
                    warn!(
                        "💳️ Transaction {reference} was opened for {} but the processor reports {}. Crediting the \
                         reported amount.",
                        tx.amount, outcome.amount
                    );
                }
                if self.db.mark_successful_and_credit(&reference, outcome.amount).await? {
                    info!("💳️ Transaction {reference} confirmed. {} credited to user #{}", outcome.amount, tx.user_id);
                    WebhookAck::Credited { reference, amount: outcome.amount }
                } else {
                    debug!("💳️ Duplicate or late success webhook for {reference}. No change.");
                    WebhookAck::AlreadyResolved { reference }
                }
            },
            EventKind::Failure => {
                if self.db.mark_failed(&reference).await? {
                    info!("💳️ Transaction {reference} for user #{} failed at the processor", tx.user_id);
                    WebhookAck::MarkedFailed { reference }
                } else {
                    debug!("💳️ Duplicate or late failure webhook for {reference}. No change.");
                    WebhookAck::AlreadyResolved { reference }
                }
            },
            EventKind::Other(tag) => WebhookAck::Ignored(tag),
        };
        Ok(ack)
    }
}

use std::fmt::Display;

use serde::Deserialize;
use serde_json::Value;

use super::WebhookError;
use crate::db_types::{Kobo, Reference};

/// What a processor event means for the pending transaction it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Success,
    Failure,
    /// Any event we don't act on. Carries the raw tag for logging.
    Other(String),
}

impl EventKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "paymentrequest.success" | "charge.success" => Self::Success,
            "paymentrequest.failed" | "paymentrequest.failure" | "charge.failed" => Self::Failure,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Success => write!(f, "success"),
            EventKind::Failure => write!(f, "failure"),
            EventKind::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// The parts of a success or failure event the ledger needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub reference: Reference,
    pub amount: Kobo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub kind: EventKind,
    /// `None` for events we ignore.
    pub outcome: Option<PaymentOutcome>,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl WebhookEvent {
    /// Parses a (signature-verified) webhook body.
    ///
    /// Only success and failure events have their `data` inspected. They must carry a UUID `offline_reference` and an
    /// `amount` in kobo, given either as a JSON integer or as a string of decimal digits.
    pub fn parse(raw_body: &[u8]) -> Result<Self, WebhookError> {
        let envelope: Envelope =
            serde_json::from_slice(raw_body).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let kind = EventKind::from_tag(&envelope.event);
        let outcome = match kind {
            EventKind::Success | EventKind::Failure => Some(parse_outcome(&envelope.data)?),
            EventKind::Other(_) => None,
        };
        Ok(Self { kind, outcome })
    }
}

fn parse_outcome(data: &Value) -> Result<PaymentOutcome, WebhookError> {
    let reference = data
        .get("offline_reference")
        .and_then(Value::as_str)
        .ok_or_else(|| WebhookError::MalformedPayload("data.offline_reference is missing".into()))?
        .parse::<Reference>()
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
    let amount = match data.get("amount") {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| WebhookError::MalformedPayload(format!("data.amount must be a whole number of kobo: {n}")))
            .and_then(|v| Kobo::try_from(v).map_err(|e| WebhookError::MalformedPayload(e.to_string())))?,
        Some(Value::String(s)) => {
            s.parse::<Kobo>().map_err(|e| WebhookError::MalformedPayload(format!("data.amount: {e}")))?
        },
        Some(other) => return Err(WebhookError::MalformedPayload(format!("data.amount has the wrong type: {other}"))),
        None => return Err(WebhookError::MalformedPayload("data.amount is missing".into())),
    };
    Ok(PaymentOutcome { reference, amount })
}

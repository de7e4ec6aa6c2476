use hmac::{Hmac, Mac};
use sha2::Sha512;
use vault_common::Secret;

use super::WebhookError;

/// The header Paystack puts the body signature in.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

type HmacSha512 = Hmac<Sha512>;

fn new_mac(secret: &Secret<String>) -> Result<HmacSha512, WebhookError> {
    // HMAC accepts keys of any length, so this only fails if the hmac crate changes its contract.
    HmacSha512::new_from_slice(secret.reveal().as_bytes()).map_err(|_| WebhookError::InvalidSignature)
}

/// Checks `signature_header` against the HMAC-SHA512 of the raw request body.
///
/// The signature may be hex encoded (what Paystack sends) or base64 encoded. The comparison is constant-time.
/// An empty secret rejects every signature, since anyone can compute an HMAC under an empty key.
pub fn verify_signature(raw_body: &[u8], signature_header: &str, secret: &Secret<String>) -> Result<(), WebhookError> {
    let header = signature_header.trim();
    if header.is_empty() {
        return Err(WebhookError::MissingSignature);
    }
    if !secret.is_set() {
        return Err(WebhookError::InvalidSignature);
    }
    let signature = hex::decode(header)
        .or_else(|_| base64::decode(header))
        .map_err(|_| WebhookError::InvalidSignature)?;
    let mut mac = new_mac(secret)?;
    mac.update(raw_body);
    mac.verify_slice(&signature).map_err(|_| WebhookError::InvalidSignature)
}

/// Produces the hex signature the processor would send for `body`. Used by tests and local tooling.
pub fn sign_payload(body: &[u8], secret: &Secret<String>) -> String {
    match new_mac(secret) {
        Ok(mut mac) => {
            mac.update(body);
            hex::encode(mac.finalize().into_bytes())
        },
        Err(_) => String::new(),
    }
}

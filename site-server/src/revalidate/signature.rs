//! Database webhook signature verification.
//!
//! Supabase database webhooks are signed with HMAC-SHA256 over the raw
//! request body, sent hex-encoded in the `x-supabase-signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC of the request body.
pub const SIGNATURE_HEADER: &str = "x-supabase-signature";

/// Verify a webhook signature.
///
/// # Arguments
///
/// * `raw_body` - The request body exactly as received
/// * `provided_hex` - The hex digest from the signature header
/// * `secret` - The shared webhook secret
///
/// # Returns
///
/// `true` only when the provided digest equals HMAC-SHA256(secret, body).
/// Any mismatch, including a length mismatch, yields `false`.
pub fn verify_signature(raw_body: &[u8], provided_hex: &str, secret: &[u8]) -> bool {
    if secret.is_empty() {
        warn!("webhook_signature_empty_secret");
        return false;
    }

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(m) => m,
        Err(_) => {
            warn!("webhook_signature_invalid_key");
            return false;
        }
    };

    mac.update(raw_body);

    let expected = hex::encode(mac.finalize().into_bytes());

    let valid = constant_time_compare(&expected, provided_hex.trim());

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = provided_hex.len(),
            "webhook_signature_mismatch"
        );
    }

    valid
}

/// Constant-time string comparison.
///
/// Inputs of different length are rejected before any content is compared.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
pub(crate) fn sign(body: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

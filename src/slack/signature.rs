//! Slack request signing (HMAC-SHA256, version `v0`)
//!
//! Slack signs `v0:{timestamp}:{raw body}` with the app's signing secret and
//! sends `v0=<hex digest>` in `X-Slack-Signature`.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Error, Result};

/// Header carrying the request signature
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Header carrying the request timestamp (unix seconds)
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

const VERSION: &str = "v0";

type HmacSha256 = Hmac<Sha256>;

fn keyed(secret: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Signature(format!("invalid signing secret: {e}")))?;
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac)
}

/// Compute the `v0=` signature Slack would send for a request
///
/// # Errors
///
/// Returns error if the secret cannot key the MAC
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> Result<String> {
    let digest = keyed(secret, timestamp, body)?.finalize().into_bytes();
    Ok(format!("{VERSION}={}", hex::encode(digest)))
}

/// Verify a request signature in constant time
///
/// # Errors
///
/// Returns error if the signature is malformed or does not match
pub fn verify(secret: &str, timestamp: &str, body: &[u8], signature: &str) -> Result<()> {
    let digest = signature
        .strip_prefix(VERSION)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or_else(|| Error::Signature("unsupported signature version".to_string()))?;
    let expected = hex::decode(digest)
        .map_err(|e| Error::Signature(format!("signature is not hex: {e}")))?;

    keyed(secret, timestamp, body)?
        .verify_slice(&expected)
        .map_err(|_| Error::Signature("signature mismatch".to_string()))
}

/// Reject timestamps further than `max_age` from `now` (unix seconds)
///
/// # Errors
///
/// Returns error if the timestamp is not an integer or is out of the window
pub fn check_freshness(timestamp: &str, now: i64, max_age: Duration) -> Result<()> {
    let sent: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| Error::Signature(format!("invalid request timestamp: {timestamp:?}")))?;
    let max_age = max_age.as_secs();

    if now.abs_diff(sent) > max_age {
        return Err(Error::Signature(format!(
            "request timestamp {sent} outside {max_age}s window"
        )));
    }

    Ok(())
}

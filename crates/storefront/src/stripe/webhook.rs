//! Webhook signature verification.
//!
//! Stripe signs `"{timestamp}.{payload}"` with HMAC-SHA256 and sends
//! `Stripe-Signature: t=<timestamp>,v1=<hex>[,v1=<hex>...]`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::error::WebhookError;

/// Maximum age of a signed delivery, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a webhook delivery against the endpoint secret.
///
/// `now` is the current Unix time in seconds.
///
/// # Errors
///
/// Returns a [`WebhookError`] describing why the delivery was rejected.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    if header.trim().is_empty() {
        return Err(WebhookError::MissingHeader);
    }

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(WebhookError::MalformedHeader)?;
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedHeader)?,
                );
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    if now.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(WebhookError::TimestampOutOfTolerance);
    }

    let expected = sign_payload(payload, timestamp, secret);
    if signatures
        .iter()
        .any(|candidate| constant_time_compare(candidate, &expected))
    {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
#[must_use]
pub fn sign_payload(payload: &[u8], timestamp: i64, secret: &str) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        // HMAC accepts keys of any length
        return String::new();
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
    const NOW: i64 = 1_760_000_000;

    fn header(timestamp: i64, payload: &[u8]) -> String {
        format!("t={timestamp},v1={}", sign_payload(payload, timestamp, SECRET))
    }

    #[test]
    fn valid_signature_is_accepted() {
        assert_eq!(verify_signature(PAYLOAD, &header(NOW, PAYLOAD), SECRET, NOW), Ok(()));
    }

    #[test]
    fn any_matching_v1_is_accepted() {
        let good = sign_payload(PAYLOAD, NOW, SECRET);
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={good}");
        assert_eq!(verify_signature(PAYLOAD, &header, SECRET, NOW), Ok(()));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = format!("t={NOW},v1={}", sign_payload(PAYLOAD, NOW, "other"));
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, NOW),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn modified_payload_is_rejected() {
        let header = header(NOW, PAYLOAD);
        assert_eq!(
            verify_signature(br#"{"id":"evt_2"}"#, &header, SECRET, NOW),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let old = NOW - SIGNATURE_TOLERANCE_SECS - 1;
        assert_eq!(
            verify_signature(PAYLOAD, &header(old, PAYLOAD), SECRET, NOW),
            Err(WebhookError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn timestamp_at_tolerance_edge_is_accepted() {
        let edge = NOW - SIGNATURE_TOLERANCE_SECS;
        assert!(verify_signature(PAYLOAD, &header(edge, PAYLOAD), SECRET, NOW).is_ok());
    }

    #[test]
    fn extreme_timestamps_are_out_of_tolerance() {
        for timestamp in [i64::MIN, i64::MAX] {
            let header = format!("t={timestamp},v1=00");
            assert_eq!(
                verify_signature(b"{}", &header, SECRET, NOW),
                Err(WebhookError::TimestampOutOfTolerance)
            );
        }
    }

    #[test]
    fn missing_parts_are_malformed() {
        let sig = sign_payload(PAYLOAD, NOW, SECRET);
        assert_eq!(
            verify_signature(PAYLOAD, &format!("v1={sig}"), SECRET, NOW),
            Err(WebhookError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(PAYLOAD, &format!("t={NOW}"), SECRET, NOW),
            Err(WebhookError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(PAYLOAD, "garbage", SECRET, NOW),
            Err(WebhookError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(PAYLOAD, "t=soon,v1=abc", SECRET, NOW),
            Err(WebhookError::MalformedHeader)
        );
    }

    #[test]
    fn empty_header_is_missing() {
        assert_eq!(
            verify_signature(PAYLOAD, "", SECRET, NOW),
            Err(WebhookError::MissingHeader)
        );
    }

    #[test]
    fn compare_rejects_different_lengths() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(!constant_time_compare("abc", "abd"));
    }
}

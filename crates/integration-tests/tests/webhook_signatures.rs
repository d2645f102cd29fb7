//! Payment webhook signing as the provider does it, verified the way the
//! storefront does.
//!
//! These tests need no running services.

use author_store_storefront::stripe::{
    SIGNATURE_TOLERANCE_SECS, WebhookError, sign_payload, verify_signature,
};

const SECRET: &str = "whsec_integration_secret";
const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
const NOW: i64 = 1_790_000_000;

fn header(timestamp: i64, secret: &str) -> String {
    format!("t={timestamp},v1={}", sign_payload(PAYLOAD, timestamp, secret))
}

#[test]
fn provider_signature_is_accepted() {
    assert!(verify_signature(PAYLOAD, &header(NOW, SECRET), SECRET, NOW).is_ok());
}

#[test]
fn rotated_secrets_send_two_signatures() {
    let old = sign_payload(PAYLOAD, NOW, "whsec_old");
    let current = sign_payload(PAYLOAD, NOW, SECRET);
    let header = format!("t={NOW},v1={old},v1={current}");
    assert!(verify_signature(PAYLOAD, &header, SECRET, NOW).is_ok());
}

#[test]
fn tampered_or_stale_deliveries_are_rejected() {
    let tampered = br#"{"id":"evt_1","type":"checkout.session.expired"}"#;
    assert!(matches!(
        verify_signature(tampered, &header(NOW, SECRET), SECRET, NOW),
        Err(WebhookError::SignatureMismatch)
    ));

    let stale = NOW - SIGNATURE_TOLERANCE_SECS - 1;
    assert!(matches!(
        verify_signature(PAYLOAD, &header(stale, SECRET), SECRET, NOW),
        Err(WebhookError::TimestampOutOfTolerance)
    ));

    assert!(matches!(
        verify_signature(PAYLOAD, "", SECRET, NOW),
        Err(WebhookError::MissingHeader)
    ));
    assert!(matches!(
        verify_signature(PAYLOAD, "v1=abc", SECRET, NOW),
        Err(WebhookError::MalformedHeader)
    ));
}

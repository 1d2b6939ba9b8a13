//! Payment webhook verification and event parsing
//!
//! Incoming webhook payloads are signed with HMAC-SHA256 over
//! `{timestamp}.{raw body}`. Verification compares in constant time and
//! rejects stale timestamps; a bad signature is a hard rejection before any
//! event processing.

use crate::payment::SessionStatus;
use belgrap_core::{AppError, AppResult};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Event type emitted when a checkout completes
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Parsed webhook event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event type (e.g. `checkout.session.completed`)
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event payload
    pub data: WebhookEventData,
}

/// Event payload wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    /// The checkout session the event is about
    pub object: SessionStatus,
}

/// Parsed signature header: `t=<unix ts>,v1=<hex digest>`
struct SignatureHeader {
    timestamp: i64,
    digest: Vec<u8>,
}

fn parse_signature_header(header: &str) -> AppResult<SignatureHeader> {
    let mut timestamp = None;
    let mut digest = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            Some(("v1", value)) => {
                digest = hex::decode(value).ok();
            }
            _ => {}
        }
    }

    match (timestamp, digest) {
        (Some(timestamp), Some(digest)) => Ok(SignatureHeader { timestamp, digest }),
        _ => Err(AppError::WebhookSignature(
            "malformed signature header".to_string(),
        )),
    }
}

/// Verify a webhook payload against its signature header
///
/// # Arguments
///
/// * `payload` - The raw request body, byte-exact as received
/// * `header` - The signature header (`t=...,v1=...`)
/// * `secret` - The webhook signing secret
/// * `tolerance_secs` - Accepted clock skew for the timestamp
///
/// # Errors
///
/// Returns `AppError::WebhookSignature` on any mismatch; the caller must not
/// process the event.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> AppResult<()> {
    let parsed = parse_signature_header(header)?;

    let age = (Utc::now().timestamp() - parsed.timestamp).abs();
    if age > tolerance_secs {
        warn!(age_secs = age, "Webhook timestamp outside tolerance");
        return Err(AppError::WebhookSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::WebhookSignature(format!("invalid secret: {}", e)))?;
    mac.update(parsed.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice is constant-time
    mac.verify_slice(&parsed.digest).map_err(|_| {
        warn!("Webhook signature mismatch");
        AppError::WebhookSignature("digest mismatch".to_string())
    })
}

/// Parse a verified webhook body into an event
pub fn parse_event(payload: &[u8]) -> AppResult<WebhookEvent> {
    serde_json::from_slice(payload)
        .map_err(|e| AppError::WebhookSignature(format!("unparseable event body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let digest = hex::encode(mac.finalize().into_bytes());
        format!("t={},v1={}", timestamp, digest)
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, Utc::now().timestamp(), SECRET);

        assert!(verify_signature(payload, &header, SECRET, 300).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, Utc::now().timestamp(), SECRET);

        let tampered = br#"{"type":"checkout.session.expired"}"#;
        assert!(matches!(
            verify_signature(tampered, &header, SECRET, 300),
            Err(AppError::WebhookSignature(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"body";
        let header = sign(payload, Utc::now().timestamp(), "other_secret");

        assert!(verify_signature(payload, &header, SECRET, 300).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"body";
        let header = sign(payload, Utc::now().timestamp() - 3600, SECRET);

        assert!(matches!(
            verify_signature(payload, &header, SECRET, 300),
            Err(AppError::WebhookSignature(_))
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_signature(b"body", "nonsense", SECRET, 300).is_err());
        assert!(verify_signature(b"body", "t=abc,v1=zz", SECRET, 300).is_err());
    }

    #[test]
    fn test_parse_event() {
        let payload = br#"{
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_1",
                    "payment_status": "paid",
                    "metadata": {"packageId": "small"}
                }
            }
        }"#;

        let event = parse_event(payload).unwrap();
        assert_eq!(event.event_type, CHECKOUT_COMPLETED);
        assert_eq!(event.data.object.id, "cs_1");
        assert!(event.data.object.is_paid());
    }
}

//! Webhook signature verification (HMAC-SHA256)
//!
//! Header format: `t=<unix seconds>,v1=<hex digest>[,v1=...]`, where the
//! digest covers `"<t>.<raw body>"`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Invalid signature header")]
    MalformedHeader,

    #[error("Invalid signature timestamp")]
    InvalidTimestamp,

    #[error("Webhook signature mismatch")]
    Mismatch,

    #[error("Webhook timestamp outside tolerance")]
    Expired,

    #[error("Webhook secret rejected by HMAC")]
    InvalidKey,
}

fn mac_for(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verify `header` against `payload` at the current time
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    verify_webhook_signature_at(
        payload,
        header,
        secret,
        tolerance_secs,
        chrono::Utc::now().timestamp(),
    )
}

pub fn verify_webhook_signature_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;

    let mac = mac_for(secret, timestamp, payload)?;
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if (now_secs - ts).abs() > tolerance_secs {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

/// Produce a header the verifier accepts
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let ts = timestamp.to_string();
    let digest = mac_for(secret, &ts, payload)?.finalize().into_bytes();
    Ok(format!("t={ts},v1={}", hex::encode(digest)))
}

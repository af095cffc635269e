//! Keyed, time-boxed token derivation and verification.
//!
//! A token is the URL-safe base64 HMAC-SHA256 of
//! `"{subject_id}:{action}:{millis}"` under the shared secret, followed by
//! `":{millis}"`. The embedded timestamp makes expiry tamper-evident: moving
//! it changes the MAC input, so a shifted timestamp no longer verifies.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// How long a token stays valid after issuance.
const TOKEN_TTL_HOURS: i64 = 24;

/// Forward grace for the embedded timestamp, covering clock skew between
/// issuing and validating hosts.
const FUTURE_GRACE_SECS: i64 = 60;

/// Derive a token for the given subject and action at the current time.
pub fn generate(secret: &str, subject_id: &str, action: &str) -> String {
    generate_at(secret, subject_id, action, Utc::now())
}

/// Derive a token at an explicit timestamp. Deterministic for identical
/// inputs down to millisecond granularity, so a re-derivation within the
/// same millisecond reissues the same token.
pub fn generate_at(secret: &str, subject_id: &str, action: &str, at: DateTime<Utc>) -> String {
    let millis = at.timestamp_millis();
    format!("{}:{}", sign(secret, subject_id, action, millis), millis)
}

/// Verify a candidate token against the current time.
pub fn is_valid(candidate: &str, secret: &str, subject_id: &str, action: &str) -> bool {
    is_valid_at(candidate, secret, subject_id, action, Utc::now())
}

/// Verify a candidate token against an explicit `now`. Returns false on any
/// malformed input; never panics.
pub fn is_valid_at(
    candidate: &str,
    secret: &str,
    subject_id: &str,
    action: &str,
    now: DateTime<Utc>,
) -> bool {
    let Some((signature, timestamp)) = candidate.rsplit_once(':') else {
        return false;
    };
    let Ok(millis) = timestamp.parse::<i64>() else {
        return false;
    };
    let Some(issued_at) = DateTime::from_timestamp_millis(millis) else {
        return false;
    };

    if now.signed_duration_since(issued_at) >= Duration::hours(TOKEN_TTL_HOURS) {
        return false;
    }
    if issued_at > now + Duration::seconds(FUTURE_GRACE_SECS) {
        return false;
    }

    let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
        return false;
    };
    let mut mac = mac_for(secret, subject_id, action, millis);
    mac.verify_slice(&signature).is_ok()
}

fn sign(secret: &str, subject_id: &str, action: &str, millis: i64) -> String {
    let mac = mac_for(secret, subject_id, action, millis);
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

fn mac_for(secret: &str, subject_id: &str, action: &str, millis: i64) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("{subject_id}:{action}:{millis}").as_bytes());
    mac
}

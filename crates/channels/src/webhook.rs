//! Payment webhook signature verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Verify a LemonSqueezy-style `X-Signature` header: lowercase hex
/// HMAC-SHA256 over the raw request body, optionally prefixed with
/// `sha256=`. Comparison is constant-time. An empty secret rejects
/// everything; unsigned payment processing is never acceptable.
pub fn validate_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        warn!("webhook secret not configured, rejecting payload");
        return false;
    }

    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_is_accepted() {
        let payload = br#"{"meta":{"event_name":"order_created"}}"#;
        let sig = sign("whsec", payload);
        assert!(validate_signature("whsec", payload, &sig));
    }

    #[test]
    fn prefixed_signature_is_accepted() {
        let payload = b"body";
        let sig = format!("sha256={}", sign("whsec", payload));
        assert!(validate_signature("whsec", payload, &sig));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let sig = sign("whsec", b"original");
        assert!(!validate_signature("whsec", b"tampered", &sig));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let sig = sign("whsec", b"body");
        assert!(!validate_signature("other", b"body", &sig));
    }

    #[test]
    fn empty_secret_rejects_everything() {
        let sig = sign("", b"body");
        assert!(!validate_signature("", b"body", &sig));
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        assert!(!validate_signature("whsec", b"body", "not-hex!"));
    }
}

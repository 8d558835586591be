//! HMAC-SHA256 payload signing.
//!
//! The signature is computed over the raw JSON body bytes and sent as
//! `v1=<hex>`. Receivers recompute it with their copy of the secret.

use anyhow::Context;
use folio_core::AppError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign a raw body with the webhook's secret.
pub fn sign(body: &[u8], secret: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .context("Invalid signing secret")?;
    mac.update(body);
    Ok(format!("v1={}", hex::encode(mac.finalize().into_bytes())))
}

/// Verify a received signature against the raw body. Accepts the value
/// with or without the `v1=` prefix.
pub fn verify(body: &[u8], secret: &str, signature: &str) -> Result<bool, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .context("Invalid signing secret")?;
    mac.update(body);

    let hex_part = signature.strip_prefix("v1=").unwrap_or(signature);
    let Ok(bytes) = hex::decode(hex_part) else {
        return Ok(false);
    };
    Ok(mac.verify_slice(&bytes).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_deterministic() {
        let a = sign(b"{\"x\":1}", "secret").unwrap();
        let b = sign(b"{\"x\":1}", "secret").unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("v1="));
        assert_eq!(a.len(), 3 + 64);
    }

    #[test]
    fn test_verify_accepts_valid_signature() {
        let body = br#"{"post":{"id":"abc"}}"#;
        let sig = sign(body, "whsec_0123456789abcdef").unwrap();
        assert!(verify(body, "whsec_0123456789abcdef", &sig).unwrap());

        // Also without the version prefix.
        let raw = sig.strip_prefix("v1=").unwrap();
        assert!(verify(body, "whsec_0123456789abcdef", raw).unwrap());
    }

    #[test]
    fn test_verify_rejects_tampered_body_or_wrong_secret() {
        let body = b"payload";
        let sig = sign(body, "secret-a").unwrap();
        assert!(!verify(b"payload2", "secret-a", &sig).unwrap());
        assert!(!verify(body, "secret-b", &sig).unwrap());
        assert!(!verify(body, "secret-a", "v1=nothex").unwrap());
    }

    #[test]
    fn test_different_secrets_give_different_signatures() {
        let a = sign(b"body", "one").unwrap();
        let b = sign(b"body", "two").unwrap();
        assert_ne!(a, b);
    }
}

//! HMAC-SHA256 primitives for request signature verification.
//!
//! Body-signed surfaces (webhooks, flow actions) carry a base64 digest of
//! the raw body; the app proxy carries a hex digest of the canonicalized
//! query. Both are computed here.
//!
//! # Security
//!
//! All digest comparisons use constant-time equality to prevent timing
//! attacks. [`matches_with_rotation`] supports zero-downtime secret
//! rotation by retrying a failed comparison with the previous secret.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::AppConfig;

type HmacSha256 = Hmac<Sha256>;

/// Computes an HMAC-SHA256 digest as a lowercase hexadecimal string.
///
/// Used for app-proxy signatures, which Shopify encodes as hex.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::verify::hmac::compute_signature_hex;
///
/// let sig = compute_signature_hex(b"message", "key");
/// assert_eq!(sig.len(), 64); // 32 bytes as hex
/// ```
#[must_use]
#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
pub fn compute_signature_hex(message: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message);
    hex_encode(&mac.finalize().into_bytes())
}

/// Computes an HMAC-SHA256 digest as standard base64.
///
/// Used for body-signed surfaces, which Shopify encodes as base64 in the
/// `X-Shopify-Hmac-SHA256` header.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::verify::hmac::compute_signature_base64;
///
/// let sig = compute_signature_base64(b"payload", "key");
/// assert_eq!(sig.len(), 44); // 32 bytes as base64
/// ```
#[must_use]
#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
pub fn compute_signature_base64(message: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Performs constant-time comparison of two strings.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::verify::hmac::constant_time_compare;
///
/// assert!(constant_time_compare("abc", "abc"));
/// assert!(!constant_time_compare("abc", "abd"));
/// ```
#[must_use]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    // ConstantTimeEq handles different lengths securely
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Checks a received digest against the configured secret(s).
///
/// Computes the expected digest with the active secret first; on mismatch,
/// retries with the old secret when one is configured. The compute step is
/// a closure so the same rotation policy serves hex and base64 surfaces.
#[must_use]
pub(crate) fn matches_with_rotation(
    config: &AppConfig,
    received: &str,
    compute: impl Fn(&str) -> String,
) -> bool {
    let expected = compute(config.api_secret_key().as_ref());
    if constant_time_compare(&expected, received) {
        return true;
    }

    if let Some(old_secret) = config.old_api_secret_key() {
        let expected_old = compute(old_secret.as_ref());
        if constant_time_compare(&expected_old, received) {
            tracing::debug!("signature matched the previous secret; rotation in progress");
            return true;
        }
    }

    false
}

// Internal hex encoding; the digest is tiny and this avoids another dependency
fn hex_encode(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
    let mut result = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        result.push(HEX_CHARS[(byte >> 4) as usize] as char);
        result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey};

    fn config_with(secret: &str, old_secret: Option<&str>) -> AppConfig {
        let mut builder = AppConfig::builder()
            .api_key(ApiKey::new("test-key").unwrap())
            .api_secret_key(ApiSecretKey::new(secret).unwrap());
        if let Some(old) = old_secret {
            builder = builder.old_api_secret_key(ApiSecretKey::new(old).unwrap());
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_compute_signature_hex_matches_known_value() {
        // HMAC-SHA256("message", "key")
        let sig = compute_signature_hex(b"message", "key");
        assert_eq!(
            sig,
            "6e9ef29b75fffc5b7abae527d58fdadb2fe42e7219011976917343065f58ed4a"
        );
    }

    #[test]
    fn test_compute_signature_hex_is_lowercase() {
        let sig = compute_signature_hex(b"test", "secret");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(sig.chars().all(|c| !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_compute_signature_base64_matches_known_value() {
        // Same vector as above, base64-encoded
        let sig = compute_signature_base64(b"message", "key");
        assert_eq!(sig, "bp7ym3X//Ft6uuUn1Y/a2y/kLnIZARl2kXNDBl9Y7Uo=");
    }

    #[test]
    fn test_compute_signature_base64_with_non_utf8_bytes() {
        let non_utf8: &[u8] = &[0x80, 0x81, 0xff, 0xfe];
        let sig = compute_signature_base64(non_utf8, "secret");
        assert_eq!(sig.len(), 44);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(!constant_time_compare("ABC", "abc"));
    }

    #[test]
    fn test_rotation_prefers_active_secret() {
        let config = config_with("active", Some("old"));
        let received = compute_signature_base64(b"body", "active");
        assert!(matches_with_rotation(&config, &received, |secret| {
            compute_signature_base64(b"body", secret)
        }));
    }

    #[test]
    fn test_rotation_falls_back_to_old_secret() {
        let config = config_with("active", Some("old"));
        let received = compute_signature_base64(b"body", "old");
        assert!(matches_with_rotation(&config, &received, |secret| {
            compute_signature_base64(b"body", secret)
        }));
    }

    #[test]
    fn test_rotation_fails_once_old_secret_is_dropped() {
        let config = config_with("active", None);
        let received = compute_signature_base64(b"body", "old");
        assert!(!matches_with_rotation(&config, &received, |secret| {
            compute_signature_base64(b"body", secret)
        }));
    }

    #[test]
    fn test_rotation_fails_when_neither_secret_matches() {
        let config = config_with("active", Some("old"));
        let received = compute_signature_hex(b"query", "unrelated");
        assert!(!matches_with_rotation(&config, &received, |secret| {
            compute_signature_hex(b"query", secret)
        }));
    }
}

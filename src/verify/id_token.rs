//! Session ID-token decoding and validation.
//!
//! Embedded surfaces authenticate with a short-lived HS256 JWT minted by the
//! platform. The same decode core serves every surface; only the
//! `exchangeable` flag differs — admin surfaces may trade their token for an
//! access token, checkout and customer-account extensions may not. The flag
//! is fixed by the verifying surface, never derived from the token itself.
//!
//! # Secret Rotation
//!
//! Decoding tries the *old* secret first when one is configured, then the
//! active secret; the first secret that verifies both signature and expiry
//! wins. (The platform signs fresh tokens with whichever secret it currently
//! holds, so during a rotation the old secret is the likelier signer.)

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::{AppConfig, ShopDomain};

/// Leeway for time-based claim validation, in seconds.
const JWT_LEEWAY_SECS: u64 = 10;

/// Decoded claims from a session ID token.
///
/// Only `dest`, `aud`, `sub`, and `exp` drive behavior in this crate; the
/// remaining claims are carried for callers that want them.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer, e.g. `https://shop.myshopify.com/admin`.
    #[serde(default)]
    pub iss: Option<String>,

    /// Destination shop, e.g. `https://shop.myshopify.com`.
    pub dest: String,

    /// Audience; must equal the app's client id.
    pub aud: String,

    /// Subject — the user id for admin sessions.
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiration (Unix timestamp).
    pub exp: i64,

    /// Not-before (Unix timestamp).
    #[serde(default)]
    pub nbf: Option<i64>,

    /// Issued-at (Unix timestamp).
    #[serde(default)]
    pub iat: Option<i64>,

    /// Unique token id.
    #[serde(default)]
    pub jti: Option<String>,

    /// Platform session id.
    #[serde(default)]
    pub sid: Option<String>,
}

/// A validated session ID token.
#[derive(Clone, Debug)]
pub struct IdToken {
    /// Whether this token may be traded for an access token. Fixed by the
    /// verifying surface.
    pub exchangeable: bool,
    /// The raw compact JWT, needed verbatim for token exchange.
    pub token: String,
    /// The decoded claims.
    pub claims: IdTokenClaims,
}

impl IdToken {
    /// Returns the shop the token is destined for, parsed from `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`IdTokenError::Invalid`] when `dest` does not reference a
    /// platform shop domain.
    pub fn shop(&self) -> Result<ShopDomain, IdTokenError> {
        shop_from_dest(&self.claims.dest)
    }

    /// Returns the numeric user id from `sub`, when present and numeric.
    #[must_use]
    pub fn user_id(&self) -> Option<u64> {
        self.claims
            .sub
            .as_ref()
            .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_digit()))
            .and_then(|sub| sub.parse().ok())
    }
}

/// Why an ID token failed validation.
///
/// The distinction matters to callers: an expired token should trigger a
/// silent re-mint on the client, a wrong audience means the token was minted
/// for a different app, and anything else is treated as tampering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdTokenError {
    /// Signature verified but the token is past its expiry (beyond leeway).
    Expired(String),
    /// Signature, structure, or claims failed validation.
    Invalid(String),
    /// The `aud` claim did not match the configured client id.
    WrongAudience,
}

impl IdTokenError {
    /// The human-readable reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Expired(reason) | Self::Invalid(reason) => reason,
            Self::WrongAudience => "ID token audience did not match the configured client id",
        }
    }
}

/// Decodes and validates a session ID token with the configured secret(s).
///
/// Tries the old secret first (when configured), then the active secret;
/// the first that verifies signature and expiry wins. After decoding, the
/// `aud` claim must equal the configured client id exactly.
///
/// # Errors
///
/// - [`IdTokenError::Expired`] when a secret verified the signature but the
///   token is expired
/// - [`IdTokenError::WrongAudience`] when `aud` does not match
/// - [`IdTokenError::Invalid`] for every other failure
pub(crate) fn decode_id_token(
    token: &str,
    config: &AppConfig,
    exchangeable: bool,
) -> Result<IdToken, IdTokenError> {
    let mut secrets = Vec::with_capacity(2);
    if let Some(old_secret) = config.old_api_secret_key() {
        secrets.push(old_secret.as_ref());
    }
    secrets.push(config.api_secret_key().as_ref());

    let mut saw_expired = false;
    let mut first_reason: Option<String> = None;

    for secret in secrets {
        match decode_with_key(token, secret) {
            Ok(claims) => {
                if claims.aud != config.api_key().as_ref() {
                    return Err(IdTokenError::WrongAudience);
                }
                return Ok(IdToken {
                    exchangeable,
                    token: token.to_string(),
                    claims,
                });
            }
            Err(err) => {
                if matches!(err.kind(), ErrorKind::ExpiredSignature) {
                    saw_expired = true;
                }
                first_reason.get_or_insert_with(|| err.to_string());
            }
        }
    }

    let reason = first_reason.unwrap_or_else(|| "no secrets configured".to_string());
    if saw_expired {
        // Signature checks run before expiry, so an ExpiredSignature from
        // any key means the token was genuinely ours and merely stale.
        Err(IdTokenError::Expired(format!(
            "ID token has expired: {reason}"
        )))
    } else {
        Err(IdTokenError::Invalid(format!(
            "ID token failed verification: {reason}"
        )))
    }
}

fn decode_with_key(
    token: &str,
    secret: &str,
) -> Result<IdTokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = JWT_LEEWAY_SECS;
    // Audience is checked manually after decoding, with its own result code
    validation.validate_aud = false;

    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<IdTokenClaims>(token, &key, &validation)?;
    Ok(token_data.claims)
}

/// Extracts the destination shop from a `dest` claim.
///
/// Strips the URL scheme and requires a platform shop domain.
pub(crate) fn shop_from_dest(dest: &str) -> Result<ShopDomain, IdTokenError> {
    let host = dest
        .strip_prefix("https://")
        .or_else(|| dest.strip_prefix("http://"))
        .unwrap_or(dest);
    let host = host.split('/').next().unwrap_or(host);

    ShopDomain::new(host).map_err(|_| {
        IdTokenError::Invalid(format!(
            "ID token dest '{dest}' does not reference a platform shop domain"
        ))
    })
}

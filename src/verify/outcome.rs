//! Shared outcome types for verifiers and token engines.
//!
//! Every operation in this crate resolves to a machine-readable [`Code`]
//! plus a human-readable detail, wrapped in a [`LogEntry`]. Operations that
//! stop processing a request resolve to a [`Halt`], which carries a fully
//! populated [`ResponseEnvelope`] the caller can relay to the client
//! verbatim — no further decision-making required.

use std::fmt;

use thiserror::Error;

use crate::http::ResponseEnvelope;

/// Machine-readable result codes.
///
/// Codes fall into three disjoint classes:
///
/// 1. caller misconfiguration (`ConfigurationError`, always HTTP 500) —
///    a programming error in the embedding app, never attacker-influenced;
/// 2. untrusted-input verification failures (400/401/405) — the request is
///    rejected and the prebuilt response relayed;
/// 3. upstream transient failures (429, 5xx, network) — retried internally
///    up to a bounded count, then surfaced as a terminal code.
///
/// `Display` renders the snake_case symbol, e.g. `invalid_hmac` or
/// `http_error_503`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Code {
    /// Caller misconfiguration; indicates a bug in the embedding app.
    ConfigurationError,
    /// Signature or token verification succeeded.
    Verified,
    /// Body-signed surfaces only accept POST.
    PostMethodExpected,
    /// None of the accepted HMAC headers were present.
    MissingHmacHeader,
    /// The body HMAC did not match with any configured secret.
    InvalidHmac,
    /// No shop header was present on a body-signed request.
    MissingShopHeader,
    /// The proxy query carried no `signature` parameter.
    MissingSignature,
    /// The proxy signature did not match with any configured secret.
    InvalidSignature,
    /// The proxy query carried no `timestamp` parameter.
    MissingTimestamp,
    /// The proxy `timestamp` parameter was not numeric.
    InvalidTimestamp,
    /// The proxy `timestamp` was outside the accepted window.
    TimestampTooOld,
    /// No `Authorization: Bearer` header on a surface that requires one.
    MissingAuthorizationHeader,
    /// The ID token failed signature or structural validation.
    InvalidIdToken,
    /// The ID token's signature verified but the token is expired.
    ExpiredIdToken,
    /// The ID token's `aud` claim did not match the configured client id.
    InvalidAud,
    /// Document request redirected to the patch-token page.
    RedirectToPatchIdTokenPage,
    /// CORS preflight short-circuit; relay the 204 response.
    OptionsRequest,
    /// Operation completed successfully.
    Success,
    /// The GraphQL response carried a non-empty `errors` array.
    GraphqlErrors,
    /// Upstream answered 401.
    Unauthorized,
    /// Upstream kept answering 429 after all retries.
    RateLimited,
    /// Token grant kept answering 429 after all retries.
    RateLimitExceeded,
    /// Transport-level failure; never retried.
    NetworkError,
    /// The token grant rejected the subject (ID) token.
    InvalidSubjectToken,
    /// The refresh grant rejected the refresh token.
    InvalidGrant,
    /// The grant rejected the client credentials (app uninstalled or
    /// secret mismatch).
    InvalidClient,
    /// Token grant failed for an unclassified reason.
    ExchangeError,
    /// Refresh grant failed for an unclassified reason.
    RefreshError,
    /// The stored refresh token has expired; re-authentication required.
    RefreshTokenExpired,
    /// The access token is still valid; no refresh performed.
    TokenStillValid,
    /// GraphQL call was missing the shop input.
    MissingShop,
    /// GraphQL call was missing the access-token input.
    MissingAccessToken,
    /// GraphQL call was missing the api-version input.
    MissingApiVersion,
    /// GraphQL call was missing the query input.
    MissingQuery,
    /// Terminal upstream status passthrough, rendered `http_error_{code}`.
    HttpError(u16),
}

impl Code {
    /// Returns `true` for the caller-misconfiguration class.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::ConfigurationError)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::ConfigurationError => "configuration_error",
            Self::Verified => "verified",
            Self::PostMethodExpected => "post_method_expected",
            Self::MissingHmacHeader => "missing_hmac_header",
            Self::InvalidHmac => "invalid_hmac",
            Self::MissingShopHeader => "missing_shop_header",
            Self::MissingSignature => "missing_signature",
            Self::InvalidSignature => "invalid_signature",
            Self::MissingTimestamp => "missing_timestamp",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::TimestampTooOld => "timestamp_too_old",
            Self::MissingAuthorizationHeader => "missing_authorization_header",
            Self::InvalidIdToken => "invalid_id_token",
            Self::ExpiredIdToken => "expired_id_token",
            Self::InvalidAud => "invalid_aud",
            Self::RedirectToPatchIdTokenPage => "redirect_to_patch_id_token_page",
            Self::OptionsRequest => "options_request",
            Self::Success => "success",
            Self::GraphqlErrors => "graphql_errors",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::NetworkError => "network_error",
            Self::InvalidSubjectToken => "invalid_subject_token",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidClient => "invalid_client",
            Self::ExchangeError => "exchange_error",
            Self::RefreshError => "refresh_error",
            Self::RefreshTokenExpired => "refresh_token_expired",
            Self::TokenStillValid => "token_still_valid",
            Self::MissingShop => "missing_shop",
            Self::MissingAccessToken => "missing_access_token",
            Self::MissingApiVersion => "missing_api_version",
            Self::MissingQuery => "missing_query",
            Self::HttpError(status) => return write!(f, "http_error_{status}"),
        };
        f.write_str(symbol)
    }
}

/// A single result-log entry: short symbol plus human-readable detail.
///
/// Every operation returns exactly one top-level `LogEntry`; operations that
/// call the network also return an ordered per-attempt trace.
#[derive(Clone, Debug)]
pub struct LogEntry {
    /// Machine-readable symbol.
    pub code: Code,
    /// Human-readable detail for operators.
    pub detail: String,
}

impl LogEntry {
    /// Creates a new log entry.
    #[must_use]
    pub fn new(code: Code, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.detail)
    }
}

/// A terminal verification outcome: stop processing and relay the response.
///
/// `Halt` is the `Err` arm of every verifier. It is not always an attack
/// signal — a CORS preflight short-circuit is a `Halt` with code
/// [`Code::OptionsRequest`] and a 204 response. In every case the embedded
/// [`ResponseEnvelope`] is fully populated and safe to send to the client
/// as-is.
#[derive(Clone, Debug, Error)]
#[error("{log}")]
pub struct Halt {
    /// What happened.
    pub log: LogEntry,
    /// The response to relay verbatim.
    pub response: ResponseEnvelope,
}

impl Halt {
    /// Creates a halt with the given code, detail, and response.
    #[must_use]
    pub fn new(code: Code, detail: impl Into<String>, response: ResponseEnvelope) -> Self {
        Self {
            log: LogEntry::new(code, detail),
            response,
        }
    }

    /// Shorthand for a caller-misconfiguration halt (HTTP 500).
    #[must_use]
    pub fn configuration_error(detail: impl Into<String>) -> Self {
        Self::new(Code::ConfigurationError, detail, ResponseEnvelope::new(500))
    }

    /// Returns the result code of this halt.
    #[must_use]
    pub const fn code(&self) -> &Code {
        &self.log.code
    }
}

// Verify outcome types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Code>();
    assert_send_sync::<LogEntry>();
    assert_send_sync::<Halt>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_render_snake_case_symbols() {
        assert_eq!(Code::ConfigurationError.to_string(), "configuration_error");
        assert_eq!(Code::InvalidHmac.to_string(), "invalid_hmac");
        assert_eq!(Code::TimestampTooOld.to_string(), "timestamp_too_old");
        assert_eq!(
            Code::RedirectToPatchIdTokenPage.to_string(),
            "redirect_to_patch_id_token_page"
        );
        assert_eq!(Code::TokenStillValid.to_string(), "token_still_valid");
    }

    #[test]
    fn test_http_error_code_renders_status() {
        assert_eq!(Code::HttpError(503).to_string(), "http_error_503");
        assert_eq!(Code::HttpError(400).to_string(), "http_error_400");
    }

    #[test]
    fn test_log_entry_display() {
        let entry = LogEntry::new(Code::InvalidHmac, "digest mismatch");
        assert_eq!(entry.to_string(), "invalid_hmac: digest mismatch");
    }

    #[test]
    fn test_configuration_error_halt_is_500() {
        let halt = Halt::configuration_error("body missing");
        assert_eq!(halt.response.status, 500);
        assert!(halt.code().is_configuration_error());
    }

    #[test]
    fn test_halt_implements_std_error() {
        let halt = Halt::new(
            Code::InvalidHmac,
            "digest mismatch",
            ResponseEnvelope::new(401),
        );
        let _: &dyn std::error::Error = &halt;
        assert_eq!(halt.to_string(), "invalid_hmac: digest mismatch");
    }
}

//! ID-token verification for extension surfaces.
//!
//! Checkout, customer-account, and admin-UI extensions all send their
//! session ID token as an `Authorization: Bearer` header, and all need a
//! CORS preflight short-circuit because extensions run on a different
//! origin from the app backend. The surfaces differ in one way: admin-UI
//! extension tokens are exchangeable for an access token, and failures on
//! that surface carry a retry header so the extension host mints a fresh
//! token and replays the request.

use crate::config::{AppConfig, ShopDomain};
use crate::http::{RequestEnvelope, ResponseEnvelope};
use crate::verify::id_token::{decode_id_token, IdToken, IdTokenError};
use crate::verify::outcome::{Code, Halt, LogEntry};

/// Header telling the extension host to mint a fresh ID token and retry.
pub const RETRY_INVALID_SESSION_HEADER: &str = "X-Shopify-Retry-Invalid-Session-Request";

/// The extension surface presenting the ID token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionSurface {
    /// Checkout UI extension; tokens are not exchangeable.
    Checkout,
    /// Customer-account UI extension; tokens are not exchangeable.
    CustomerAccount,
    /// Admin UI extension; tokens are exchangeable and failures carry the
    /// retry header.
    AdminUi,
}

impl ExtensionSurface {
    /// Whether tokens from this surface may be traded for an access token.
    #[must_use]
    pub const fn exchangeable(self) -> bool {
        matches!(self, Self::AdminUi)
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Checkout => "checkout extension",
            Self::CustomerAccount => "customer account extension",
            Self::AdminUi => "admin UI extension",
        }
    }
}

/// A successfully verified extension request.
#[derive(Clone, Debug)]
pub struct ExtensionSession {
    /// The shop the session belongs to.
    pub shop: ShopDomain,
    /// The validated ID token; exchangeable only for the admin-UI surface.
    pub id_token: IdToken,
    /// Merchant user id from the token's subject, when numeric.
    pub user_id: Option<u64>,
    /// Prebuilt 401-plus-retry-header response for the admin-UI surface.
    ///
    /// Attach it to a *later* failed downstream API call so the extension
    /// host can mint a fresh token and retry the original request
    /// coherently. `None` for non-exchangeable surfaces.
    pub new_id_token_response: Option<ResponseEnvelope>,
    /// Top-level result log.
    pub log: LogEntry,
    /// A 200 response; relayable if the caller has nothing else to say.
    pub response: ResponseEnvelope,
}

/// Verifies an extension request's bearer ID token.
///
/// `OPTIONS` requests carrying an `Origin` header short-circuit into a CORS
/// preflight halt (code `options_request`, 204) before the bearer header is
/// required — relay that response and stop.
///
/// # Errors
///
/// Halts with `options_request` (204, the preflight short-circuit),
/// `missing_authorization_header` (401), `invalid_id_token` /
/// `expired_id_token` / `invalid_aud` (all 401). On the admin-UI surface,
/// every post-header failure response carries
/// [`RETRY_INVALID_SESSION_HEADER`].
pub fn verify_extension_request(
    config: &AppConfig,
    surface: ExtensionSurface,
    request: &RequestEnvelope,
) -> Result<ExtensionSession, Halt> {
    if let Some(halt) = preflight_halt(request) {
        return Err(halt);
    }

    let Some(token) = bearer_token(request) else {
        return Err(Halt::new(
            Code::MissingAuthorizationHeader,
            format!("no bearer ID token on {} request", surface.label()),
            ResponseEnvelope::new(401),
        ));
    };

    let id_token = decode_id_token(token, config, surface.exchangeable())
        .map_err(|err| token_halt(&err, surface.exchangeable()))?;

    let shop = id_token
        .shop()
        .map_err(|err| token_halt(&err, surface.exchangeable()))?;

    let new_id_token_response = surface
        .exchangeable()
        .then(|| retry_response(401));

    Ok(ExtensionSession {
        shop,
        user_id: id_token.user_id(),
        id_token,
        new_id_token_response,
        log: LogEntry::new(
            Code::Verified,
            format!("{} request verified", surface.label()),
        ),
        response: ResponseEnvelope::new(200),
    })
}

/// Builds the CORS preflight halt for an `OPTIONS` request with an `Origin`
/// header, or `None` when the request is not a preflight.
pub(crate) fn preflight_halt(request: &RequestEnvelope) -> Option<Halt> {
    if request.method() != "OPTIONS" || request.header("origin").is_none() {
        return None;
    }

    let response = ResponseEnvelope::new(204)
        .with_header("Access-Control-Allow-Origin", "*")
        .with_header("Access-Control-Allow-Headers", "Authorization, Content-Type")
        .with_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .with_header("Access-Control-Expose-Headers", RETRY_INVALID_SESSION_HEADER);

    Some(Halt::new(
        Code::OptionsRequest,
        "CORS preflight answered before authentication",
        response,
    ))
}

/// Extracts the token from an `Authorization: Bearer` header.
pub(crate) fn bearer_token(request: &RequestEnvelope) -> Option<&str> {
    request
        .header("authorization")?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Builds a response carrying the retry-invalid-session header.
pub(crate) fn retry_response(status: u16) -> ResponseEnvelope {
    ResponseEnvelope::new(status).with_header(RETRY_INVALID_SESSION_HEADER, "1")
}

/// Maps an ID-token failure onto a 401 halt, attaching the retry header on
/// exchangeable surfaces.
pub(crate) fn token_halt(err: &IdTokenError, with_retry_header: bool) -> Halt {
    let code = match err {
        IdTokenError::Expired(_) => Code::ExpiredIdToken,
        IdTokenError::Invalid(_) => Code::InvalidIdToken,
        IdTokenError::WrongAudience => Code::InvalidAud,
    };
    let response = if with_retry_header {
        retry_response(401)
    } else {
        ResponseEnvelope::new(401)
    };
    Halt::new(code, err.reason().to_string(), response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde::Serialize;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(Debug, Serialize)]
    struct TestClaims {
        dest: String,
        aud: String,
        sub: Option<String>,
        exp: i64,
        nbf: i64,
        iat: i64,
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn mint_token(secret: &str, exp_offset: i64) -> String {
        let now = now();
        let claims = TestClaims {
            dest: "https://test-shop.myshopify.com".to_string(),
            aud: "test-client-id".to_string(),
            sub: Some("42".to_string()),
            exp: now + exp_offset,
            nbf: now - 10,
            iat: now,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn config() -> AppConfig {
        AppConfig::builder()
            .api_key(ApiKey::new("test-client-id").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .build()
            .unwrap()
    }

    fn bearer_request(token: &str) -> RequestEnvelope {
        RequestEnvelope::builder("GET", "/api/data")
            .header("Authorization", format!("Bearer {token}"))
            .build()
    }

    #[test]
    fn test_checkout_surface_verifies_without_retry_affordances() {
        let token = mint_token("secret", 300);
        let session =
            verify_extension_request(&config(), ExtensionSurface::Checkout, &bearer_request(&token))
                .unwrap();

        assert_eq!(session.shop.shop_name(), "test-shop");
        assert_eq!(session.user_id, Some(42));
        assert!(!session.id_token.exchangeable);
        assert!(session.new_id_token_response.is_none());
        assert_eq!(session.log.code, Code::Verified);
    }

    #[test]
    fn test_admin_ui_surface_is_exchangeable_with_retry_response() {
        let token = mint_token("secret", 300);
        let session =
            verify_extension_request(&config(), ExtensionSurface::AdminUi, &bearer_request(&token))
                .unwrap();

        assert!(session.id_token.exchangeable);
        let retry = session.new_id_token_response.unwrap();
        assert_eq!(retry.status, 401);
        assert_eq!(retry.header(RETRY_INVALID_SESSION_HEADER), Some("1"));
    }

    #[test]
    fn test_options_with_origin_short_circuits_to_preflight() {
        let request = RequestEnvelope::builder("OPTIONS", "/api/data")
            .header("Origin", "https://extensions.shopifycdn.com")
            .build();

        let halt =
            verify_extension_request(&config(), ExtensionSurface::Checkout, &request).unwrap_err();

        assert_eq!(*halt.code(), Code::OptionsRequest);
        assert_eq!(halt.response.status, 204);
        assert_eq!(halt.response.header("Access-Control-Allow-Origin"), Some("*"));
        assert!(halt
            .response
            .header("Access-Control-Allow-Headers")
            .unwrap()
            .contains("Authorization"));
    }

    #[test]
    fn test_options_without_origin_is_not_a_preflight() {
        let request = RequestEnvelope::builder("OPTIONS", "/api/data").build();
        let halt =
            verify_extension_request(&config(), ExtensionSurface::Checkout, &request).unwrap_err();

        // Falls through to the missing-header rejection
        assert_eq!(*halt.code(), Code::MissingAuthorizationHeader);
    }

    #[test]
    fn test_missing_bearer_header_rejected_without_retry_header() {
        let request = RequestEnvelope::builder("GET", "/api/data").build();
        let halt =
            verify_extension_request(&config(), ExtensionSurface::AdminUi, &request).unwrap_err();

        assert_eq!(*halt.code(), Code::MissingAuthorizationHeader);
        assert_eq!(halt.response.status, 401);
        assert_eq!(halt.response.header(RETRY_INVALID_SESSION_HEADER), None);
    }

    #[test]
    fn test_invalid_token_on_admin_ui_carries_retry_header() {
        let token = mint_token("wrong-secret", 300);
        let halt =
            verify_extension_request(&config(), ExtensionSurface::AdminUi, &bearer_request(&token))
                .unwrap_err();

        assert_eq!(*halt.code(), Code::InvalidIdToken);
        assert_eq!(halt.response.header(RETRY_INVALID_SESSION_HEADER), Some("1"));
    }

    #[test]
    fn test_invalid_token_on_checkout_has_no_retry_header() {
        let token = mint_token("wrong-secret", 300);
        let halt = verify_extension_request(
            &config(),
            ExtensionSurface::Checkout,
            &bearer_request(&token),
        )
        .unwrap_err();

        assert_eq!(*halt.code(), Code::InvalidIdToken);
        assert_eq!(halt.response.header(RETRY_INVALID_SESSION_HEADER), None);
    }

    #[test]
    fn test_expired_token_classified_separately() {
        let token = mint_token("secret", -3600);
        let halt = verify_extension_request(
            &config(),
            ExtensionSurface::CustomerAccount,
            &bearer_request(&token),
        )
        .unwrap_err();

        assert_eq!(*halt.code(), Code::ExpiredIdToken);
        assert_eq!(halt.response.status, 401);
    }

    #[test]
    fn test_bearer_token_extraction() {
        let request = RequestEnvelope::builder("GET", "/")
            .header("Authorization", "Bearer abc.def.ghi")
            .build();
        assert_eq!(bearer_token(&request), Some("abc.def.ghi"));

        let basic = RequestEnvelope::builder("GET", "/")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .build();
        assert_eq!(bearer_token(&basic), None);

        let empty = RequestEnvelope::builder("GET", "/")
            .header("Authorization", "Bearer ")
            .build();
        assert_eq!(bearer_token(&empty), None);
    }
}

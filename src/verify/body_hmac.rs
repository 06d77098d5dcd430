//! Body-HMAC verification for webhook and flow-action requests.
//!
//! These surfaces sign the raw request body with the app's client secret
//! and send the base64 digest in a header. The two surfaces differ only in
//! which header names they accept, so both verifiers share one routine
//! parameterized by a surface descriptor.

use crate::config::AppConfig;
use crate::http::{RequestEnvelope, ResponseEnvelope};
use crate::verify::hmac::{compute_signature_base64, matches_with_rotation};
use crate::verify::outcome::{Code, Halt, LogEntry};

/// Platform domain suffix stripped when extracting the shop label.
const SHOP_SUFFIX: &str = ".myshopify.com";

/// Accepted header names for one body-signed surface.
///
/// Header lists are ordered; the first present header wins.
struct BodySurface {
    label: &'static str,
    hmac_headers: &'static [&'static str],
    shop_headers: &'static [&'static str],
}

const WEBHOOK_SURFACE: BodySurface = BodySurface {
    label: "webhook",
    hmac_headers: &["x-shopify-hmac-sha256", "shopify-hmac-sha256"],
    shop_headers: &["x-shopify-shop-domain", "shopify-shop-domain"],
};

const FLOW_SURFACE: BodySurface = BodySurface {
    label: "flow action",
    hmac_headers: &["x-shopify-hmac-sha256"],
    shop_headers: &["x-shopify-shop-domain"],
};

/// A successfully verified body-signed request.
#[derive(Clone, Debug)]
pub struct BodyVerification {
    /// Shop label with the platform domain suffix stripped.
    pub shop: String,
    /// Which surface verified the request.
    pub surface: &'static str,
    /// Top-level result log.
    pub log: LogEntry,
    /// A 200 response; relayable if the caller has nothing else to say.
    pub response: ResponseEnvelope,
}

/// Verifies a webhook delivery against the raw body digest.
///
/// Accepts the digest in `X-Shopify-Hmac-SHA256` or the legacy
/// `Shopify-Hmac-SHA256` header, and the shop in `X-Shopify-Shop-Domain` or
/// `Shopify-Shop-Domain`.
///
/// # Errors
///
/// Halts with `configuration_error` (500) when the envelope carries no body
/// (a caller bug — the raw body must be captured before any parsing),
/// `post_method_expected` (405), `missing_hmac_header` (400),
/// `invalid_hmac` (401), or `missing_shop_header` (400).
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, RequestEnvelope};
/// use shopify_app_auth::verify::hmac::compute_signature_base64;
/// use shopify_app_auth::verify::verify_webhook_request;
///
/// let config = AppConfig::builder()
///     .api_key(ApiKey::new("key").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .build()
///     .unwrap();
///
/// let body = r#"{"id":42}"#;
/// let request = RequestEnvelope::builder("POST", "/webhooks")
///     .header("X-Shopify-Hmac-SHA256", compute_signature_base64(body.as_bytes(), "secret"))
///     .header("X-Shopify-Shop-Domain", "test-shop.myshopify.com")
///     .body(body)
///     .build();
///
/// let verification = verify_webhook_request(&config, &request).unwrap();
/// assert_eq!(verification.shop, "test-shop");
/// ```
pub fn verify_webhook_request(
    config: &AppConfig,
    request: &RequestEnvelope,
) -> Result<BodyVerification, Halt> {
    verify_signed_body(config, request, &WEBHOOK_SURFACE)
}

/// Verifies a flow-action invocation against the raw body digest.
///
/// Flow actions only ever send the modern header names, so no legacy
/// fallbacks are accepted here.
///
/// # Errors
///
/// Same halt conditions as [`verify_webhook_request`].
pub fn verify_flow_request(
    config: &AppConfig,
    request: &RequestEnvelope,
) -> Result<BodyVerification, Halt> {
    verify_signed_body(config, request, &FLOW_SURFACE)
}

fn verify_signed_body(
    config: &AppConfig,
    request: &RequestEnvelope,
    surface: &BodySurface,
) -> Result<BodyVerification, Halt> {
    // A missing raw body means the embedding app consumed or re-parsed the
    // request before verification — a caller bug, not an attack.
    let Some(body) = request.body() else {
        return Err(Halt::configuration_error(format!(
            "{} verification requires the raw request body",
            surface.label
        )));
    };

    if request.method() != "POST" {
        return Err(Halt::new(
            Code::PostMethodExpected,
            format!(
                "{} requests must be POST, received {}",
                surface.label,
                request.method()
            ),
            ResponseEnvelope::new(405),
        ));
    }

    let Some(received) = surface
        .hmac_headers
        .iter()
        .find_map(|name| request.header(name))
    else {
        return Err(Halt::new(
            Code::MissingHmacHeader,
            format!("no HMAC header found on {} request", surface.label),
            ResponseEnvelope::new(400),
        ));
    };

    if !matches_with_rotation(config, received, |secret| {
        compute_signature_base64(body.as_bytes(), secret)
    }) {
        return Err(Halt::new(
            Code::InvalidHmac,
            format!("{} HMAC did not match request body", surface.label),
            ResponseEnvelope::new(401),
        ));
    }

    let Some(shop_header) = surface
        .shop_headers
        .iter()
        .find_map(|name| request.header(name))
    else {
        return Err(Halt::new(
            Code::MissingShopHeader,
            format!("no shop header found on {} request", surface.label),
            ResponseEnvelope::new(400),
        ));
    };

    let shop = shop_header
        .strip_suffix(SHOP_SUFFIX)
        .unwrap_or(shop_header)
        .to_string();

    Ok(BodyVerification {
        shop,
        surface: surface.label,
        log: LogEntry::new(
            Code::Verified,
            format!("{} request verified", surface.label),
        ),
        response: ResponseEnvelope::new(200),
    })
}

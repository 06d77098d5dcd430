//! App-proxy signature verification.
//!
//! Storefront-proxy requests are signed over their query parameters rather
//! than the body: Shopify removes the `signature` parameter, sorts the rest
//! by key, concatenates `key=value` pairs with no separator (multi-valued
//! keys joined with commas), and sends the hex HMAC-SHA256 of that string.
//! The canonicalization here must reproduce that algorithm exactly.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::AppConfig;
use crate::http::{decode_component, RequestEnvelope, ResponseEnvelope};
use crate::verify::hmac::{compute_signature_hex, matches_with_rotation};
use crate::verify::outcome::{Code, Halt, LogEntry};

/// Platform domain suffix stripped when extracting the shop label.
const SHOP_SUFFIX: &str = ".myshopify.com";

/// Maximum accepted distance between the request timestamp and now.
const TIMESTAMP_WINDOW_SECS: i64 = 90;

/// A successfully verified app-proxy request.
#[derive(Clone, Debug)]
pub struct ProxyVerification {
    /// Shop label with the platform domain suffix stripped.
    pub shop: String,
    /// Storefront customer id, when a customer is logged in.
    ///
    /// This identifies a *customer* of the shop; it is a different identity
    /// class from merchant user ids and must never be treated as one.
    pub logged_in_customer_id: Option<String>,
    /// Top-level result log.
    pub log: LogEntry,
    /// A 200 response; relayable if the caller has nothing else to say.
    pub response: ResponseEnvelope,
}

/// Verifies an app-proxy request's query signature.
///
/// # Errors
///
/// Halts with `missing_signature`, `missing_timestamp`, `invalid_timestamp`,
/// `timestamp_too_old`, or `invalid_signature` — all 401; the proxy surface
/// exposes nothing to distinguish attackers worth a 400.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, RequestEnvelope};
/// use shopify_app_auth::verify::verify_proxy_request;
///
/// # fn sign(query: &str, secret: &str) -> String {
/// #     shopify_app_auth::verify::hmac::compute_signature_hex(query.as_bytes(), secret)
/// # }
/// let config = AppConfig::builder()
///     .api_key(ApiKey::new("key").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .build()
///     .unwrap();
///
/// let now = std::time::SystemTime::now()
///     .duration_since(std::time::UNIX_EPOCH)
///     .unwrap()
///     .as_secs();
/// let canonical = format!("shop=test-shop.myshopify.comtimestamp={now}");
/// let signature = sign(&canonical, "secret");
/// let url = format!("/proxy?shop=test-shop.myshopify.com&timestamp={now}&signature={signature}");
///
/// let request = RequestEnvelope::builder("GET", url).build();
/// let verification = verify_proxy_request(&config, &request).unwrap();
/// assert_eq!(verification.shop, "test-shop");
/// ```
pub fn verify_proxy_request(
    config: &AppConfig,
    request: &RequestEnvelope,
) -> Result<ProxyVerification, Halt> {
    let params = parse_query_grouped(request.query().unwrap_or(""));

    let Some(signature) = params
        .get("signature")
        .and_then(|values| values.first())
        .cloned()
    else {
        return Err(unauthorized(
            Code::MissingSignature,
            "proxy request carried no signature parameter",
        ));
    };

    validate_timestamp(&params)?;

    let canonical = canonical_query(&params);
    if !matches_with_rotation(config, &signature, |secret| {
        compute_signature_hex(canonical.as_bytes(), secret)
    }) {
        return Err(unauthorized(
            Code::InvalidSignature,
            "proxy signature did not match canonicalized query",
        ));
    }

    let shop = params
        .get("shop")
        .and_then(|values| values.first())
        .map(|shop| shop.strip_suffix(SHOP_SUFFIX).unwrap_or(shop).to_string())
        .unwrap_or_default();

    let logged_in_customer_id = params
        .get("logged_in_customer_id")
        .and_then(|values| values.first())
        .filter(|id| !id.is_empty())
        .cloned();

    Ok(ProxyVerification {
        shop,
        logged_in_customer_id,
        log: LogEntry::new(Code::Verified, "app proxy request verified"),
        response: ResponseEnvelope::new(200),
    })
}

/// Parses a query string into key → values, preserving duplicates in order.
///
/// The `BTreeMap` gives the byte-wise key ordering the canonical form
/// requires; values for a repeated key keep their document order.
fn parse_query_grouped(query: &str) -> BTreeMap<String, Vec<String>> {
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(decode_component(key))
            .or_default()
            .push(decode_component(value));
    }
    params
}

/// Builds the canonical signing string: sorted `key=value` pairs with no
/// separator between pairs, multi-valued keys joined with commas, and the
/// `signature` parameter removed.
fn canonical_query(params: &BTreeMap<String, Vec<String>>) -> String {
    let mut canonical = String::new();
    for (key, values) in params {
        if key == "signature" {
            continue;
        }
        canonical.push_str(key);
        canonical.push('=');
        canonical.push_str(&values.join(","));
    }
    canonical
}

fn validate_timestamp(params: &BTreeMap<String, Vec<String>>) -> Result<(), Halt> {
    let Some(timestamp) = params.get("timestamp").and_then(|values| values.first()) else {
        return Err(unauthorized(
            Code::MissingTimestamp,
            "proxy request carried no timestamp parameter",
        ));
    };

    let Ok(timestamp) = timestamp.parse::<i64>() else {
        return Err(unauthorized(
            Code::InvalidTimestamp,
            "proxy timestamp was not numeric",
        ));
    };

    let now = unix_now();
    if (now - timestamp).abs() > TIMESTAMP_WINDOW_SECS {
        return Err(unauthorized(
            Code::TimestampTooOld,
            format!("proxy timestamp was {}s away from now", (now - timestamp).abs()),
        ));
    }

    Ok(())
}

fn unauthorized(code: Code, detail: impl Into<String>) -> Halt {
    Halt::new(code, detail, ResponseEnvelope::new(401))
}

#[allow(clippy::cast_possible_wrap)] // u64 seconds stay far below i64::MAX
fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

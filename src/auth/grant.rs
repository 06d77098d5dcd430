//! Shared plumbing for the OAuth token grants.
//!
//! All three engines POST JSON to `{base}/admin/oauth/access_token` and
//! classify the reply the same way; only the grant parameters and retry
//! policies differ. The helpers here capture one reply per attempt in a
//! relayable, loggable form.
//!
//! Grant requests carry the client secret and grant replies carry token
//! material, so attempt logs built here never include bodies.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::config::{AppConfig, ShopDomain};
use crate::http::{HttpAttempt, RequestSnapshot, ResponseEnvelope, ResponseSnapshot};
use crate::verify::{Code, LogEntry};

/// Grant type for token exchange (RFC 8693).
pub(crate) const TOKEN_EXCHANGE_GRANT_TYPE: &str =
    "urn:ietf:params:oauth:grant-type:token-exchange";

/// Subject token type for ID tokens (RFC 8693).
pub(crate) const ID_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:id_token";

/// Grant type for refresh token requests.
pub(crate) const REFRESH_TOKEN_GRANT_TYPE: &str = "refresh_token";

/// Grant type for client credentials.
pub(crate) const CLIENT_CREDENTIALS_GRANT_TYPE: &str = "client_credentials";

/// A terminal token-engine failure.
///
/// Mirrors the verifier [`Halt`](crate::verify::Halt) shape, with the
/// ordered per-attempt trace added: `response` is fully populated and safe
/// to relay, and `log` mirrors the final attempt.
#[derive(Clone, Debug, Error)]
#[error("{log}")]
pub struct TokenFailure {
    /// What ultimately happened.
    pub log: LogEntry,
    /// The response to relay verbatim.
    pub response: ResponseEnvelope,
    /// Ordered trace of every network attempt made.
    pub http_logs: Vec<HttpAttempt>,
}

impl TokenFailure {
    /// A caller-misconfiguration failure (HTTP 500, no attempts made).
    #[must_use]
    pub(crate) fn configuration_error(detail: impl Into<String>) -> Self {
        Self {
            log: LogEntry::new(Code::ConfigurationError, detail),
            response: ResponseEnvelope::new(500),
            http_logs: Vec::new(),
        }
    }
}

/// One captured reply from the token endpoint.
#[derive(Debug)]
pub(crate) struct GrantReply {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl GrantReply {
    /// Parses the `error` field of an OAuth error body, if present.
    pub(crate) fn oauth_error(&self) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()?
            .get("error")?
            .as_str()
            .map(str::to_string)
    }

    /// Parses the `Retry-After` header, in seconds.
    pub(crate) fn retry_after(&self) -> Option<f64> {
        self.headers
            .get("retry-after")
            .and_then(|value| value.parse().ok())
    }

    /// A body-less snapshot for attempt logs (token material stays out).
    pub(crate) fn snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot {
            status: self.status,
            headers: self.headers.clone(),
            body: None,
        }
    }
}

/// Returns the token endpoint URL for a shop, honoring `api_host`.
pub(crate) fn token_endpoint(config: &AppConfig, shop: &ShopDomain) -> String {
    format!("{}/admin/oauth/access_token", config.endpoint_base(shop))
}

/// Builds the product-identifying user agent for outbound requests.
pub(crate) fn product_user_agent(config: &AppConfig) -> String {
    let prefix = config
        .user_agent_prefix()
        .map_or(String::new(), |prefix| format!("{prefix} | "));
    format!(
        "{prefix}Shopify App Auth Library v{} | Rust {}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_RUST_VERSION"),
    )
}

/// POSTs a grant request and captures the reply.
///
/// # Errors
///
/// Returns the transport error unchanged; callers classify it as
/// `network_error` and never retry it.
pub(crate) async fn post_grant<T: Serialize>(
    url: &str,
    request_body: &T,
    user_agent: &str,
) -> Result<GrantReply, reqwest::Error> {
    let client = reqwest::Client::new();
    let response = client
        .post(url)
        .header("User-Agent", user_agent)
        .header("Accept", "application/json")
        .json(request_body)
        .send()
        .await?;

    let status = response.status().as_u16();
    let mut headers = BTreeMap::new();
    for (name, value) in response.headers() {
        headers.insert(
            name.as_str().to_lowercase(),
            value.to_str().unwrap_or_default().to_string(),
        );
    }
    let body = response.text().await.unwrap_or_default();

    Ok(GrantReply {
        status,
        headers,
        body,
    })
}

/// A body-less request snapshot for a grant attempt.
pub(crate) fn grant_request_snapshot(url: &str, user_agent: &str) -> RequestSnapshot {
    let mut headers = BTreeMap::new();
    headers.insert("User-Agent".to_string(), user_agent.to_string());
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    RequestSnapshot::new("POST", url, headers, None)
}

/// Appends an attempt entry for a reply.
pub(crate) fn log_attempt(
    http_logs: &mut Vec<HttpAttempt>,
    request: RequestSnapshot,
    reply: &GrantReply,
    code: Code,
    detail: impl Into<String>,
) {
    http_logs.push(HttpAttempt {
        log: LogEntry::new(code, detail),
        request,
        response: Some(reply.snapshot()),
    });
}

/// Builds the terminal `network_error` failure for a transport error.
pub(crate) fn network_failure(
    err: &reqwest::Error,
    request: RequestSnapshot,
    mut http_logs: Vec<HttpAttempt>,
) -> TokenFailure {
    let detail = format!("network error during token grant: {err}");
    http_logs.push(HttpAttempt {
        log: LogEntry::new(Code::NetworkError, detail.clone()),
        request,
        response: None,
    });
    TokenFailure {
        log: LogEntry::new(Code::NetworkError, detail),
        response: ResponseEnvelope::new(500),
        http_logs,
    }
}

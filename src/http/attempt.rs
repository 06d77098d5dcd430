//! Per-attempt logs for outbound HTTP calls.
//!
//! Token engines and the GraphQL executor may hit the network several times
//! per operation (rate-limit retries, 5xx backoff). Each attempt — success
//! or failure — is recorded as an [`HttpAttempt`] so callers can feed an
//! ordered trace into their own telemetry. The access-token header is
//! masked in every snapshot; the refresh engine omits bodies entirely.

use std::collections::BTreeMap;

use crate::verify::LogEntry;

/// Header names whose values are masked in request snapshots.
const SENSITIVE_HEADERS: &[&str] = &["X-Shopify-Access-Token", "Authorization"];

/// Snapshot of an outbound request as it was sent.
#[derive(Clone, Debug)]
pub struct RequestSnapshot {
    /// HTTP method.
    pub method: String,
    /// Full request URL.
    pub url: String,
    /// Request headers; sensitive values masked.
    pub headers: BTreeMap<String, String>,
    /// Request body; `None` when bodies are withheld (token material).
    pub body: Option<String>,
}

impl RequestSnapshot {
    /// Creates a snapshot, masking sensitive header values.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        headers: BTreeMap<String, String>,
        body: Option<String>,
    ) -> Self {
        let mut headers = headers;
        for name in SENSITIVE_HEADERS {
            if let Some(value) = headers.get_mut(*name) {
                *value = "*****".to_string();
            }
        }
        Self {
            method: method.into(),
            url: url.into(),
            headers,
            body,
        }
    }
}

/// Snapshot of the upstream response to one attempt.
#[derive(Clone, Debug)]
pub struct ResponseSnapshot {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Response body; `None` when bodies are withheld (token material).
    pub body: Option<String>,
}

/// One entry in an operation's ordered attempt trace.
///
/// `response` is `None` when the attempt failed before a response arrived
/// (transport error).
#[derive(Clone, Debug)]
pub struct HttpAttempt {
    /// Outcome of this attempt.
    pub log: LogEntry,
    /// The request as sent.
    pub request: RequestSnapshot,
    /// The upstream response, if one arrived.
    pub response: Option<ResponseSnapshot>,
}

//! Admin GraphQL executor with classification-driven retries.
//!
//! One call, one decision per upstream reply:
//!
//! - 200 with a non-empty `errors` array is an *application* failure —
//!   terminal, never retried, surfaced as `graphql_errors`
//! - 401 is terminal; when the caller supplied the verifier's
//!   `invalid_token_response`, it is relayed so the embedding surface can
//!   re-mint its ID token and replay the original request
//! - 429 sleeps for `Retry-After` and retries
//! - 502/503/504 retry with exponential backoff plus jitter
//! - 400 (malformed query) and 403 (insufficient scope) are terminal;
//!   retrying cannot fix either
//! - transport errors are terminal immediately
//!
//! Every attempt lands in the ordered `http_logs` trace with the
//! access-token header masked.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use thiserror::Error;

use crate::auth::product_user_agent;
use crate::config::{AppConfig, ShopDomain};
use crate::http::{HttpAttempt, RequestSnapshot, ResponseEnvelope, ResponseSnapshot};
use crate::verify::{Code, LogEntry};

/// Default extra attempts for retryable statuses.
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default sleep when a 429 carries no `Retry-After`, in seconds.
const DEFAULT_RETRY_AFTER_SECS: f64 = 1.0;

/// Base delay for 5xx exponential backoff, in milliseconds.
const BACKOFF_BASE_MS: u64 = 500;

/// Maximum jitter added to each backoff sleep, in milliseconds.
const BACKOFF_JITTER_MS: u64 = 100;

/// One Admin GraphQL call, assembled with [`GraphqlCall::builder`].
#[derive(Clone, Debug)]
pub struct GraphqlCall {
    shop: String,
    access_token: String,
    api_version: String,
    query: String,
    variables: Option<serde_json::Value>,
    headers: HashMap<String, String>,
    max_retries: u32,
    invalid_token_response: Option<ResponseEnvelope>,
}

impl GraphqlCall {
    /// Creates a builder for the given query string.
    #[must_use]
    pub fn builder(query: impl Into<String>) -> GraphqlCallBuilder {
        GraphqlCallBuilder {
            call: Self {
                shop: String::new(),
                access_token: String::new(),
                api_version: String::new(),
                query: query.into(),
                variables: None,
                headers: HashMap::new(),
                max_retries: DEFAULT_MAX_RETRIES,
                invalid_token_response: None,
            },
        }
    }
}

/// Builder for [`GraphqlCall`].
///
/// Inputs are validated by [`execute_graphql`], not here, so that missing
/// values surface as relayable 400 results instead of construction panics.
#[derive(Clone, Debug)]
pub struct GraphqlCallBuilder {
    call: GraphqlCall,
}

impl GraphqlCallBuilder {
    /// Sets the shop (bare label or full platform domain).
    #[must_use]
    pub fn shop(mut self, shop: impl Into<String>) -> Self {
        self.call.shop = shop.into();
        self
    }

    /// Sets the access token.
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.call.access_token = token.into();
        self
    }

    /// Sets the Admin API version, e.g. `2025-10`.
    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.call.api_version = version.into();
        self
    }

    /// Sets the query variables.
    #[must_use]
    pub fn variables(mut self, variables: serde_json::Value) -> Self {
        self.call.variables = Some(variables);
        self
    }

    /// Adds an extra request header; caller headers win over defaults.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.call.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the retry budget for 429 and 502/503/504 replies.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.call.max_retries = max_retries;
        self
    }

    /// Attaches the verifier's prebuilt "mint a fresh ID token" response,
    /// relayed verbatim when the upstream answers 401.
    #[must_use]
    pub fn invalid_token_response(mut self, response: ResponseEnvelope) -> Self {
        self.call.invalid_token_response = Some(response);
        self
    }

    /// Finalizes the call.
    #[must_use]
    pub fn build(self) -> GraphqlCall {
        self.call
    }
}

/// A successful GraphQL execution.
#[derive(Clone, Debug)]
pub struct GraphqlSuccess {
    /// The response's `data` field.
    pub data: serde_json::Value,
    /// The response's `extensions` field (cost info and the like).
    pub extensions: Option<serde_json::Value>,
    /// Top-level result log.
    pub log: LogEntry,
    /// Ordered trace of every attempt made.
    pub http_logs: Vec<HttpAttempt>,
}

/// A terminal GraphQL failure.
///
/// `response` is fully populated and safe to relay; `log` mirrors the last
/// attempt's outcome.
#[derive(Clone, Debug, Error)]
#[error("{log}")]
pub struct GraphqlFailure {
    /// What ultimately happened.
    pub log: LogEntry,
    /// The response to relay verbatim.
    pub response: ResponseEnvelope,
    /// Ordered trace of every attempt made.
    pub http_logs: Vec<HttpAttempt>,
}

impl GraphqlFailure {
    fn pre_network(code: Code, detail: impl Into<String>) -> Self {
        Self {
            log: LogEntry::new(code, detail),
            response: ResponseEnvelope::new(400),
            http_logs: Vec::new(),
        }
    }
}

/// Executes an Admin GraphQL call.
///
/// # Errors
///
/// - `missing_shop` / `missing_access_token` / `missing_api_version` /
///   `missing_query` (400): empty required inputs, caught before any
///   network traffic
/// - `graphql_errors`: the query executed but returned errors
/// - `unauthorized` (401): access token rejected; relays the caller's
///   `invalid_token_response` when one was attached
/// - `rate_limited` (429): still rate-limited after the retry budget
/// - `http_error_{code}`: terminal upstream status (including 502/503/504
///   after the retry budget, 400, 403, and anything unclassified)
/// - `network_error` (500): transport failure, never retried
///
/// # Example
///
/// ```rust,ignore
/// use shopify_app_auth::graphql::{execute_graphql, GraphqlCall};
///
/// let call = GraphqlCall::builder("query { shop { name } }")
///     .shop("my-store")
///     .access_token("shpat_...")
///     .api_version("2025-10")
///     .build();
///
/// let result = execute_graphql(&config, &call).await?;
/// println!("{}", result.data["shop"]["name"]);
/// ```
pub async fn execute_graphql(
    config: &AppConfig,
    call: &GraphqlCall,
) -> Result<GraphqlSuccess, GraphqlFailure> {
    validate_inputs(call)?;

    let base = match ShopDomain::new(&call.shop) {
        Ok(domain) => config.endpoint_base(&domain),
        // Not a platform domain; let the caller's host (or api_host) stand
        Err(_) => config.api_host().map_or_else(
            || format!("https://{}", call.shop),
            |host| host.as_ref().to_string(),
        ),
    };
    let url = format!("{base}/admin/api/{}/graphql.json", call.api_version);

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Accept".to_string(), "application/json".to_string());
    headers.insert("User-Agent".to_string(), product_user_agent(config));
    headers.insert(
        "X-Shopify-Access-Token".to_string(),
        call.access_token.clone(),
    );
    // Caller-supplied headers override the defaults
    for (name, value) in &call.headers {
        headers.insert(name.clone(), value.clone());
    }

    let body = serde_json::json!({
        "query": call.query,
        "variables": call.variables,
    })
    .to_string();

    let client = reqwest::Client::new();
    let mut http_logs: Vec<HttpAttempt> = Vec::new();
    let mut attempt: u32 = 0;
    loop {
        let request_snapshot =
            RequestSnapshot::new("POST", &url, headers.clone(), Some(body.clone()));

        let mut builder = client.post(&url).body(body.clone());
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }

        let reply = match builder.send().await {
            Ok(reply) => reply,
            Err(err) => {
                let detail = format!("network error during GraphQL call: {err}");
                http_logs.push(HttpAttempt {
                    log: LogEntry::new(Code::NetworkError, detail.clone()),
                    request: request_snapshot,
                    response: None,
                });
                return Err(GraphqlFailure {
                    log: LogEntry::new(Code::NetworkError, detail),
                    response: ResponseEnvelope::new(500),
                    http_logs,
                });
            }
        };

        let status = reply.status().as_u16();
        let mut reply_headers = BTreeMap::new();
        for (name, value) in reply.headers() {
            reply_headers.insert(
                name.as_str().to_lowercase(),
                value.to_str().unwrap_or_default().to_string(),
            );
        }
        let reply_body = reply.text().await.unwrap_or_default();

        let snapshot = ResponseSnapshot {
            status,
            headers: reply_headers.clone(),
            body: Some(reply_body.clone()),
        };
        let passthrough = ResponseEnvelope {
            status,
            body: reply_body.clone(),
            headers: reply_headers.clone(),
        };

        match status {
            200 => match parse_graphql_body(&reply_body) {
                ParsedBody::Data { data, extensions } => {
                    let log = LogEntry::new(Code::Success, "GraphQL query executed");
                    http_logs.push(HttpAttempt {
                        log: log.clone(),
                        request: request_snapshot,
                        response: Some(snapshot),
                    });
                    return Ok(GraphqlSuccess {
                        data,
                        extensions,
                        log,
                        http_logs,
                    });
                }
                ParsedBody::Errors(count) => {
                    return Err(terminal(
                        http_logs,
                        request_snapshot,
                        snapshot,
                        Code::GraphqlErrors,
                        format!("GraphQL response carried {count} error(s)"),
                        passthrough,
                    ));
                }
                ParsedBody::Unparseable(err) => {
                    return Err(terminal(
                        http_logs,
                        request_snapshot,
                        snapshot,
                        Code::HttpError(200),
                        format!("GraphQL response body was not valid JSON: {err}"),
                        passthrough,
                    ));
                }
            },
            401 => {
                let response = call
                    .invalid_token_response
                    .clone()
                    .unwrap_or(passthrough);
                return Err(terminal(
                    http_logs,
                    request_snapshot,
                    snapshot,
                    Code::Unauthorized,
                    "access token rejected by the Admin API".to_string(),
                    response,
                ));
            }
            429 => {
                if attempt < call.max_retries {
                    let wait = reply_headers
                        .get("retry-after")
                        .and_then(|value| value.parse::<f64>().ok())
                        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                    http_logs.push(HttpAttempt {
                        log: LogEntry::new(
                            Code::RateLimited,
                            format!("rate limited; retrying in {wait}s"),
                        ),
                        request: request_snapshot,
                        response: Some(snapshot),
                    });
                    tracing::warn!(wait, attempt, "GraphQL call rate limited; backing off");
                    tokio::time::sleep(std::time::Duration::from_secs_f64(wait)).await;
                    attempt += 1;
                    continue;
                }
                return Err(terminal(
                    http_logs,
                    request_snapshot,
                    snapshot,
                    Code::RateLimited,
                    "still rate limited after all retries".to_string(),
                    ResponseEnvelope::new(429).with_body(reply_body),
                ));
            }
            502 | 503 | 504 => {
                if attempt < call.max_retries {
                    let jitter = rand::thread_rng().gen_range(0..BACKOFF_JITTER_MS);
                    let delay_ms = BACKOFF_BASE_MS * 2_u64.pow(attempt) + jitter;
                    http_logs.push(HttpAttempt {
                        log: LogEntry::new(
                            Code::HttpError(status),
                            format!("upstream {status}; retrying in {delay_ms}ms"),
                        ),
                        request: request_snapshot,
                        response: Some(snapshot),
                    });
                    tracing::warn!(
                        status,
                        delay_ms,
                        attempt,
                        "GraphQL upstream error; backing off"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                    continue;
                }
                return Err(terminal(
                    http_logs,
                    request_snapshot,
                    snapshot,
                    Code::HttpError(status),
                    format!("upstream {status} persisted after all retries"),
                    passthrough,
                ));
            }
            400 => {
                return Err(terminal(
                    http_logs,
                    request_snapshot,
                    snapshot,
                    Code::HttpError(400),
                    "Admin API rejected the request as malformed".to_string(),
                    passthrough,
                ));
            }
            403 => {
                return Err(terminal(
                    http_logs,
                    request_snapshot,
                    snapshot,
                    Code::HttpError(403),
                    "access token lacks the scopes this query requires".to_string(),
                    passthrough,
                ));
            }
            other => {
                return Err(terminal(
                    http_logs,
                    request_snapshot,
                    snapshot,
                    Code::HttpError(other),
                    format!("Admin API answered with unexpected status {other}"),
                    passthrough,
                ));
            }
        }
    }
}

/// Appends the final attempt entry and builds the terminal failure.
fn terminal(
    mut http_logs: Vec<HttpAttempt>,
    request: RequestSnapshot,
    snapshot: ResponseSnapshot,
    code: Code,
    detail: String,
    response: ResponseEnvelope,
) -> GraphqlFailure {
    http_logs.push(HttpAttempt {
        log: LogEntry::new(code.clone(), detail.clone()),
        request,
        response: Some(snapshot),
    });
    GraphqlFailure {
        log: LogEntry::new(code, detail),
        response,
        http_logs,
    }
}

fn validate_inputs(call: &GraphqlCall) -> Result<(), GraphqlFailure> {
    if call.shop.is_empty() {
        return Err(GraphqlFailure::pre_network(
            Code::MissingShop,
            "GraphQL call requires a shop",
        ));
    }
    if call.access_token.is_empty() {
        return Err(GraphqlFailure::pre_network(
            Code::MissingAccessToken,
            "GraphQL call requires an access token",
        ));
    }
    if call.api_version.is_empty() {
        return Err(GraphqlFailure::pre_network(
            Code::MissingApiVersion,
            "GraphQL call requires an API version",
        ));
    }
    if call.query.is_empty() {
        return Err(GraphqlFailure::pre_network(
            Code::MissingQuery,
            "GraphQL call requires a query",
        ));
    }
    Ok(())
}

enum ParsedBody {
    Data {
        data: serde_json::Value,
        extensions: Option<serde_json::Value>,
    },
    Errors(usize),
    Unparseable(String),
}

fn parse_graphql_body(body: &str) -> ParsedBody {
    let parsed: serde_json::Value = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(err) => return ParsedBody::Unparseable(err.to_string()),
    };

    if let Some(errors) = parsed.get("errors").and_then(serde_json::Value::as_array) {
        if !errors.is_empty() {
            return ParsedBody::Errors(errors.len());
        }
    }

    ParsedBody::Data {
        data: parsed.get("data").cloned().unwrap_or(serde_json::Value::Null),
        extensions: parsed.get("extensions").cloned(),
    }
}

//! Token exchange: trading a session ID token for an access token.
//!
//! Implements the OAuth 2.0 Token Exchange grant (RFC 8693) with the
//! platform's token-type URNs. Only exchangeable ID tokens — those minted
//! for admin surfaces — may be traded; handing this engine a checkout or
//! customer-account token is a caller bug, not a verification failure.
//!
//! Rate limiting (429) is the one transient failure this grant retries:
//! two extra attempts, sleeping for the upstream's `Retry-After`. Network
//! errors are terminal immediately — the grant is not idempotent enough to
//! blind-retry a request that may have half-landed.

use serde::Serialize;

use crate::auth::access_token::{AccessMode, AccessTokenResponse, TokenExchangeAccessToken};
use crate::auth::grant::{
    grant_request_snapshot, log_attempt, network_failure, post_grant, product_user_agent,
    token_endpoint, GrantReply, TokenFailure, ID_TOKEN_TYPE, TOKEN_EXCHANGE_GRANT_TYPE,
};
use crate::config::{AppConfig, ShopDomain};
use crate::http::{HttpAttempt, RequestSnapshot, ResponseEnvelope};
use crate::verify::{Code, IdToken, LogEntry};

/// Extra attempts after the first 429.
const RATE_LIMIT_RETRIES: u32 = 2;

/// Default sleep when a 429 carries no `Retry-After`, in seconds.
const DEFAULT_RETRY_AFTER_SECS: f64 = 1.0;

/// Requested token type URNs for the exchange grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestedTokenType {
    OnlineAccessToken,
    OfflineAccessToken,
}

impl RequestedTokenType {
    const fn as_urn(self) -> &'static str {
        match self {
            Self::OnlineAccessToken => "urn:shopify:params:oauth:token-type:online-access-token",
            Self::OfflineAccessToken => "urn:shopify:params:oauth:token-type:offline-access-token",
        }
    }

    const fn for_mode(mode: AccessMode) -> Self {
        match mode {
            AccessMode::Online => Self::OnlineAccessToken,
            AccessMode::Offline => Self::OfflineAccessToken,
        }
    }
}

/// Request body for the token-exchange grant.
#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    subject_token: &'a str,
    subject_token_type: &'a str,
    requested_token_type: &'a str,
}

/// A successful token exchange.
#[derive(Clone, Debug)]
pub struct TokenExchangeOutcome {
    /// The freshly minted access token. Persisting it is the caller's job.
    pub token: TokenExchangeAccessToken,
    /// Top-level result log.
    pub log: LogEntry,
    /// Ordered trace of every network attempt made.
    pub http_logs: Vec<HttpAttempt>,
}

/// Exchanges an exchangeable ID token for an access token.
///
/// `invalid_token_response` is the prebuilt response a verifier returned
/// (see [`ExtensionSession::new_id_token_response`]); when the grant rejects
/// the subject token, relaying it lets the embedding surface mint a fresh ID
/// token and retry the original request automatically.
///
/// [`ExtensionSession::new_id_token_response`]:
/// crate::verify::ExtensionSession::new_id_token_response
///
/// # Errors
///
/// - `configuration_error` (500): non-exchangeable or empty ID token, or a
///   destination that is not a platform shop — caller bugs, all caught
///   before any network traffic
/// - `invalid_subject_token` (401): the grant rejected the ID token;
///   `response` is the caller-supplied `invalid_token_response` when given
/// - `invalid_client` (500): app likely uninstalled or secret mismatch
/// - `rate_limit_exceeded` (429): still rate-limited after all retries
/// - `exchange_error` (500): any other upstream rejection
/// - `network_error` (500): transport failure, never retried
pub async fn exchange_token(
    config: &AppConfig,
    access_mode: AccessMode,
    id_token: &IdToken,
    invalid_token_response: Option<ResponseEnvelope>,
) -> Result<TokenExchangeOutcome, TokenFailure> {
    if !id_token.exchangeable {
        return Err(TokenFailure::configuration_error(
            "ID token from this surface is not exchangeable for an access token",
        ));
    }
    if id_token.token.is_empty() {
        return Err(TokenFailure::configuration_error(
            "ID token string is empty",
        ));
    }
    let shop = id_token.shop().map_err(|err| {
        TokenFailure::configuration_error(format!(
            "ID token destination is not a platform shop: {}",
            err.reason()
        ))
    })?;

    let url = token_endpoint(config, &shop);
    let user_agent = product_user_agent(config);
    let request_body = TokenExchangeRequest {
        client_id: config.api_key().as_ref(),
        client_secret: config.api_secret_key().as_ref(),
        grant_type: TOKEN_EXCHANGE_GRANT_TYPE,
        subject_token: &id_token.token,
        subject_token_type: ID_TOKEN_TYPE,
        requested_token_type: RequestedTokenType::for_mode(access_mode).as_urn(),
    };

    let mut http_logs = Vec::new();
    let mut attempt = 0;
    loop {
        let request_snapshot = grant_request_snapshot(&url, &user_agent);
        let reply = match post_grant(&url, &request_body, &user_agent).await {
            Ok(reply) => reply,
            Err(err) => return Err(network_failure(&err, request_snapshot, http_logs)),
        };

        if reply.status == 200 {
            return finish_success(access_mode, shop, reply, request_snapshot, http_logs);
        }

        if reply.status == 429 {
            if attempt < RATE_LIMIT_RETRIES {
                let wait = reply.retry_after().unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                log_attempt(
                    &mut http_logs,
                    request_snapshot,
                    &reply,
                    Code::RateLimitExceeded,
                    format!("token exchange rate limited; retrying in {wait}s"),
                );
                tracing::warn!(wait, attempt, "token exchange rate limited; backing off");
                tokio::time::sleep(std::time::Duration::from_secs_f64(wait)).await;
                attempt += 1;
                continue;
            }

            let detail = "token exchange still rate limited after retries";
            log_attempt(
                &mut http_logs,
                request_snapshot,
                &reply,
                Code::RateLimitExceeded,
                detail,
            );
            return Err(TokenFailure {
                log: LogEntry::new(Code::RateLimitExceeded, detail),
                response: ResponseEnvelope::new(429).with_body(reply.body),
                http_logs,
            });
        }

        return Err(classify_rejection(
            reply,
            request_snapshot,
            http_logs,
            invalid_token_response,
        ));
    }
}

fn finish_success(
    access_mode: AccessMode,
    shop: ShopDomain,
    reply: GrantReply,
    request_snapshot: RequestSnapshot,
    mut http_logs: Vec<HttpAttempt>,
) -> Result<TokenExchangeOutcome, TokenFailure> {
    let parsed: AccessTokenResponse = match serde_json::from_str(&reply.body) {
        Ok(parsed) => parsed,
        Err(err) => {
            let detail = format!("token exchange returned an unparseable body: {err}");
            log_attempt(
                &mut http_logs,
                request_snapshot,
                &reply,
                Code::ExchangeError,
                detail.clone(),
            );
            return Err(TokenFailure {
                log: LogEntry::new(Code::ExchangeError, detail),
                response: ResponseEnvelope::new(500),
                http_logs,
            });
        }
    };

    let detail = format!("exchanged ID token for an {access_mode} access token");
    log_attempt(
        &mut http_logs,
        request_snapshot,
        &reply,
        Code::Success,
        detail.clone(),
    );
    Ok(TokenExchangeOutcome {
        token: parsed.into_token(access_mode, shop),
        log: LogEntry::new(Code::Success, detail),
        http_logs,
    })
}

fn classify_rejection(
    reply: GrantReply,
    request_snapshot: RequestSnapshot,
    mut http_logs: Vec<HttpAttempt>,
    invalid_token_response: Option<ResponseEnvelope>,
) -> TokenFailure {
    let (code, detail, response) = match reply.oauth_error().as_deref() {
        Some("invalid_subject_token") => (
            Code::InvalidSubjectToken,
            "token exchange rejected the ID token".to_string(),
            invalid_token_response.unwrap_or_else(|| ResponseEnvelope::new(401)),
        ),
        Some("invalid_client") => (
            Code::InvalidClient,
            "token exchange rejected the client credentials (app uninstalled or secret mismatch)"
                .to_string(),
            ResponseEnvelope::new(500),
        ),
        _ => (
            Code::ExchangeError,
            format!("token exchange failed with status {}", reply.status),
            ResponseEnvelope::new(500),
        ),
    };

    log_attempt(&mut http_logs, request_snapshot, &reply, code.clone(), detail.clone());
    TokenFailure {
        log: LogEntry::new(code, detail),
        response,
        http_logs,
    }
}

//! Access-token refresh with expiry short-circuiting.
//!
//! Shops on expiring offline tokens hand back a refresh token alongside the
//! access token. This engine renews the access token via the
//! `refresh_token` grant, but only when renewal is actually due: a token
//! still valid for more than a minute short-circuits with no network call,
//! and an expired refresh token means the merchant must re-authenticate —
//! no grant will fix that.
//!
//! Attempt logs for this engine never contain request or response bodies;
//! both directions are pure token material.

use serde::Serialize;

use crate::auth::access_token::{AccessTokenResponse, TokenExchangeAccessToken};
use crate::auth::grant::{
    grant_request_snapshot, log_attempt, network_failure, post_grant, product_user_agent,
    token_endpoint, TokenFailure, REFRESH_TOKEN_GRANT_TYPE,
};
use crate::config::AppConfig;
use crate::http::{HttpAttempt, ResponseEnvelope};
use crate::verify::{Code, LogEntry};

/// Access tokens valid for longer than this are not refreshed.
const EXPIRY_GRACE_SECS: i64 = 60;

/// Extra attempts after a 5xx reply.
const SERVER_ERROR_RETRIES: u32 = 2;

/// Request body for the refresh grant.
#[derive(Debug, Serialize)]
struct TokenRefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    refresh_token: &'a str,
}

/// The successful outcomes of a refresh call.
#[derive(Clone, Debug)]
pub enum RefreshOutcome {
    /// The access token is still comfortably valid; nothing was done and
    /// the caller should keep using the token it already has.
    StillValid {
        /// Top-level result log (`token_still_valid`).
        log: LogEntry,
    },
    /// A new access token was minted.
    Refreshed {
        /// The renewed token; persisting it is the caller's job.
        token: TokenExchangeAccessToken,
        /// Top-level result log.
        log: LogEntry,
        /// Ordered trace of every network attempt made (body-less).
        http_logs: Vec<HttpAttempt>,
    },
}

/// Refreshes an access token when renewal is due.
///
/// # Errors
///
/// - `refresh_token_expired` (401): the refresh token itself has lapsed;
///   the caller must delete the stored token and re-authenticate
/// - `configuration_error` (500): the token needs a refresh but carries no
///   refresh token — the caller stored a non-expiring token here by mistake
/// - `invalid_grant` (401): the grant rejected the refresh token
/// - `invalid_client` (500): secret mismatch or app uninstalled
/// - `refresh_error` (500): 5xx after all retries, or any other rejection
/// - `network_error` (500): transport failure, never retried
pub async fn refresh_access_token(
    config: &AppConfig,
    token: &TokenExchangeAccessToken,
) -> Result<RefreshOutcome, TokenFailure> {
    if token.refresh_token_expired() {
        return Err(TokenFailure {
            log: LogEntry::new(
                Code::RefreshTokenExpired,
                "refresh token has expired; re-authentication required",
            ),
            response: ResponseEnvelope::new(401),
            http_logs: Vec::new(),
        });
    }

    if !token.expires_within(EXPIRY_GRACE_SECS) {
        return Ok(RefreshOutcome::StillValid {
            log: LogEntry::new(
                Code::TokenStillValid,
                format!("access token valid for more than {EXPIRY_GRACE_SECS}s; refresh skipped"),
            ),
        });
    }

    let Some(refresh_token) = token.refresh_token.as_deref() else {
        return Err(TokenFailure::configuration_error(
            "access token needs a refresh but carries no refresh token",
        ));
    };

    let url = token_endpoint(config, &token.shop);
    let user_agent = product_user_agent(config);
    let request_body = TokenRefreshRequest {
        client_id: config.api_key().as_ref(),
        client_secret: config.api_secret_key().as_ref(),
        grant_type: REFRESH_TOKEN_GRANT_TYPE,
        refresh_token,
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
            let parsed: AccessTokenResponse = match serde_json::from_str(&reply.body) {
                Ok(parsed) => parsed,
                Err(err) => {
                    let detail = format!("token refresh returned an unparseable body: {err}");
                    log_attempt(
                        &mut http_logs,
                        request_snapshot,
                        &reply,
                        Code::RefreshError,
                        detail.clone(),
                    );
                    return Err(TokenFailure {
                        log: LogEntry::new(Code::RefreshError, detail),
                        response: ResponseEnvelope::new(500),
                        http_logs,
                    });
                }
            };

            let detail = "access token refreshed";
            log_attempt(
                &mut http_logs,
                request_snapshot,
                &reply,
                Code::Success,
                detail,
            );
            // Mode and shop survive a refresh unchanged; so does the user
            // context when the grant reply doesn't restate it
            let mut renewed = parsed.into_token(token.access_mode, token.shop.clone());
            if renewed.user.is_none() {
                renewed.user.clone_from(&token.user);
            }
            return Ok(RefreshOutcome::Refreshed {
                token: renewed,
                log: LogEntry::new(Code::Success, detail),
                http_logs,
            });
        }

        if reply.status >= 500 && attempt < SERVER_ERROR_RETRIES {
            log_attempt(
                &mut http_logs,
                request_snapshot,
                &reply,
                Code::RefreshError,
                format!("token refresh hit upstream {}; retrying", reply.status),
            );
            tracing::warn!(status = reply.status, attempt, "token refresh retrying");
            attempt += 1;
            continue;
        }

        let (code, status, detail) = match reply.oauth_error().as_deref() {
            Some("invalid_grant") => (
                Code::InvalidGrant,
                401,
                "refresh grant rejected the refresh token".to_string(),
            ),
            Some("invalid_client") => (
                Code::InvalidClient,
                500,
                "refresh grant rejected the client credentials".to_string(),
            ),
            _ => (
                Code::RefreshError,
                500,
                format!("token refresh failed with status {}", reply.status),
            ),
        };

        log_attempt(
            &mut http_logs,
            request_snapshot,
            &reply,
            code.clone(),
            detail.clone(),
        );
        return Err(TokenFailure {
            log: LogEntry::new(code, detail),
            response: ResponseEnvelope::new(status),
            http_logs,
        });
    }
}

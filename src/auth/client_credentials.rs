//! Client-credentials grant for server-to-server access tokens.
//!
//! The one grant that needs no inbound request at all: given only a shop
//! label, the app trades its client id and secret for an offline access
//! token. The platform issues these with a nominal 24-hour lifetime;
//! callers simply request a new one when the old one lapses.

use serde::Serialize;

use crate::auth::access_token::{
    AccessMode, AccessTokenResponse, ClientCredentialsAccessToken,
};
use crate::auth::grant::{
    grant_request_snapshot, log_attempt, network_failure, post_grant, product_user_agent,
    token_endpoint, TokenFailure, CLIENT_CREDENTIALS_GRANT_TYPE,
};
use crate::config::{is_valid_shop_label, AppConfig, ShopDomain};
use crate::http::{HttpAttempt, ResponseEnvelope};
use crate::verify::{Code, LogEntry};

/// Request body for the client-credentials grant.
#[derive(Debug, Serialize)]
struct ClientCredentialsRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
}

/// A successful client-credentials exchange.
#[derive(Clone, Debug)]
pub struct ClientCredentialsOutcome {
    /// The offline access token. Persisting it is the caller's job.
    pub token: ClientCredentialsAccessToken,
    /// Top-level result log.
    pub log: LogEntry,
    /// Ordered trace of every network attempt made.
    pub http_logs: Vec<HttpAttempt>,
}

/// Obtains an offline access token using only the app's own credentials.
///
/// `shop` must be a bare label (`my-store`, not `my-store.myshopify.com`):
/// the label is validated *before* any URL is built from it, so a malformed
/// value can never steer the grant request at a foreign host.
///
/// # Errors
///
/// - `configuration_error` (500): the shop label is empty, carries a domain
///   suffix, or contains invalid characters
/// - `invalid_client` (500): credentials rejected (app uninstalled or
///   secret mismatch)
/// - `exchange_error` (500): any other upstream rejection
/// - `network_error` (500): transport failure, never retried
pub async fn client_credentials_token(
    config: &AppConfig,
    shop: &str,
) -> Result<ClientCredentialsOutcome, TokenFailure> {
    if !is_valid_shop_label(shop) {
        return Err(TokenFailure::configuration_error(format!(
            "'{shop}' is not a valid shop label; pass the bare label without a domain suffix"
        )));
    }
    // The label just validated, so this cannot fail
    let shop = ShopDomain::new(shop).map_err(|err| {
        TokenFailure::configuration_error(format!("shop label rejected: {err}"))
    })?;

    let url = token_endpoint(config, &shop);
    let user_agent = product_user_agent(config);
    let request_body = ClientCredentialsRequest {
        client_id: config.api_key().as_ref(),
        client_secret: config.api_secret_key().as_ref(),
        grant_type: CLIENT_CREDENTIALS_GRANT_TYPE,
    };

    let mut http_logs = Vec::new();
    let request_snapshot = grant_request_snapshot(&url, &user_agent);
    let reply = match post_grant(&url, &request_body, &user_agent).await {
        Ok(reply) => reply,
        Err(err) => return Err(network_failure(&err, request_snapshot, http_logs)),
    };

    if reply.status == 200 {
        let parsed: AccessTokenResponse = match serde_json::from_str(&reply.body) {
            Ok(parsed) => parsed,
            Err(err) => {
                let detail = format!("client credentials grant returned an unparseable body: {err}");
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

        let detail = "obtained an offline access token via client credentials";
        log_attempt(
            &mut http_logs,
            request_snapshot,
            &reply,
            Code::Success,
            detail,
        );
        let token = parsed.into_token(AccessMode::Offline, shop);
        return Ok(ClientCredentialsOutcome {
            token: ClientCredentialsAccessToken {
                shop: token.shop,
                token: token.token,
                expires: token.expires,
                scope: token.scope,
            },
            log: LogEntry::new(Code::Success, detail),
            http_logs,
        });
    }

    let (code, detail) = match reply.oauth_error().as_deref() {
        Some("invalid_client") => (
            Code::InvalidClient,
            "client credentials grant rejected the client (app uninstalled or secret mismatch)"
                .to_string(),
        ),
        _ => (
            Code::ExchangeError,
            format!("client credentials grant failed with status {}", reply.status),
        ),
    };

    log_attempt(
        &mut http_logs,
        request_snapshot,
        &reply,
        code.clone(),
        detail.clone(),
    );
    Err(TokenFailure {
        log: LogEntry::new(code, detail),
        response: ResponseEnvelope::new(500),
        http_logs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey};

    fn config() -> AppConfig {
        AppConfig::builder()
            .api_key(ApiKey::new("test-client-id").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_shop_label_is_configuration_error() {
        let failure = client_credentials_token(&config(), "").await.unwrap_err();

        assert_eq!(failure.log.code, Code::ConfigurationError);
        assert_eq!(failure.response.status, 500);
        assert!(failure.http_logs.is_empty());
    }

    #[tokio::test]
    async fn test_domain_suffix_rejected_before_url_construction() {
        let failure = client_credentials_token(&config(), "my-store.myshopify.com")
            .await
            .unwrap_err();

        assert_eq!(failure.log.code, Code::ConfigurationError);
        assert!(failure.log.detail.contains("bare label"));
    }

    #[tokio::test]
    async fn test_invalid_characters_rejected() {
        for label in ["-leading", "has space", "path/injection", "a.b"] {
            let failure = client_credentials_token(&config(), label).await.unwrap_err();
            assert_eq!(failure.log.code, Code::ConfigurationError, "label {label}");
        }
    }

    #[test]
    fn test_request_body_serializes_grant_fields() {
        let request = ClientCredentialsRequest {
            client_id: "id",
            client_secret: "secret",
            grant_type: CLIENT_CREDENTIALS_GRANT_TYPE,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"grant_type\":\"client_credentials\""));
        assert!(json.contains("\"client_id\":\"id\""));
    }
}

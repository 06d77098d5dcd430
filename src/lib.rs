//! # Shopify App Auth
//!
//! Request verification and access-token lifecycle management for embedded
//! Shopify apps, with a retrying Admin GraphQL executor.
//!
//! ## Overview
//!
//! This crate covers the security-critical core an embedded app needs:
//!
//! - Type-safe configuration via [`AppConfig`] and [`AppConfigBuilder`],
//!   with zero-downtime secret rotation
//! - Body-HMAC verification for webhooks and flow actions
//! - Canonicalized-query signature verification for app-proxy requests
//! - ID-token verification for checkout, customer-account, and admin-UI
//!   extensions, and for the admin home surface (document and fetch modes)
//! - Token exchange, token refresh, and client-credentials grants
//! - An Admin GraphQL executor with rate-limit and backoff retry handling
//!
//! It is framework-agnostic: requests come in as [`RequestEnvelope`] values
//! and every rejection comes back as a relayable [`ResponseEnvelope`].
//! Credential persistence is the caller's responsibility — tokens are
//! returned, never stored.
//!
//! ## Verifying a webhook
//!
//! ```rust,ignore
//! use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, RequestEnvelope};
//! use shopify_app_auth::verify::verify_webhook_request;
//!
//! let config = AppConfig::builder()
//!     .api_key(ApiKey::new("client-id")?)
//!     .api_secret_key(ApiSecretKey::new("client-secret")?)
//!     .build()?;
//!
//! let request = RequestEnvelope::builder("POST", "/webhooks")
//!     .header("X-Shopify-Hmac-SHA256", hmac_header)
//!     .header("X-Shopify-Shop-Domain", shop_header)
//!     .body(raw_body)
//!     .build();
//!
//! match verify_webhook_request(&config, &request) {
//!     Ok(verification) => println!("webhook from {}", verification.shop),
//!     Err(halt) => return relay(halt.response), // relay verbatim
//! }
//! ```
//!
//! ## Authenticating an admin request and exchanging the token
//!
//! ```rust,ignore
//! use shopify_app_auth::auth::{exchange_token, AccessMode};
//! use shopify_app_auth::verify::verify_admin_request;
//!
//! let session = verify_admin_request(&config, &request, "/patch-id-token")
//!     .map_err(|halt| relay(halt.response))?;
//!
//! let outcome = exchange_token(
//!     &config,
//!     AccessMode::Offline,
//!     &session.id_token,
//!     Some(session.new_id_token_response.clone()),
//! )
//! .await?;
//! // Persist outcome.token — storage is the caller's job
//! ```
//!
//! ## Calling the Admin GraphQL API
//!
//! ```rust,ignore
//! use shopify_app_auth::graphql::{execute_graphql, GraphqlCall};
//!
//! let call = GraphqlCall::builder("query { shop { name } }")
//!     .shop(token.shop.as_ref())
//!     .access_token(&token.token)
//!     .api_version("2025-10")
//!     .build();
//!
//! let result = execute_graphql(&config, &call).await?;
//! println!("{}", result.data["shop"]["name"]);
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: the immutable [`AppConfig`] is passed explicitly
//! - **Relayable rejections**: every failed verification yields a complete
//!   response; callers relay it without inspecting anything
//! - **No panics across the boundary**: decode and crypto failures become
//!   typed results
//! - **Thread-safe**: all types are `Send + Sync`; operations are stateless
//!   and safe to run concurrently

pub mod auth;
pub mod config;
pub mod error;
pub mod graphql;
pub mod http;
pub mod verify;

// Re-export the types most callers touch at the crate root
pub use auth::{
    client_credentials_token, exchange_token, refresh_access_token, AccessMode, AssociatedUser,
    ClientCredentialsAccessToken, ClientCredentialsOutcome, RefreshOutcome, TokenExchangeAccessToken,
    TokenExchangeOutcome, TokenFailure,
};
pub use config::{ApiKey, ApiSecretKey, ApiVersion, AppConfig, AppConfigBuilder, HostUrl, ShopDomain};
pub use error::ConfigError;
pub use graphql::{execute_graphql, GraphqlCall, GraphqlFailure, GraphqlSuccess};
pub use http::{HttpAttempt, RequestEnvelope, ResponseEnvelope};
pub use verify::{Code, Halt, IdToken, LogEntry};

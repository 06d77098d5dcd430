//! Access-token lifecycle engines.
//!
//! Three OAuth grants against `POST {base}/admin/oauth/access_token`:
//!
//! - [`exchange_token`]: trades an exchangeable ID token for an access
//!   token (RFC 8693 token exchange); retries on 429
//! - [`refresh_access_token`]: renews an expiring access token, with
//!   expiry short-circuiting so callers can invoke it unconditionally;
//!   retries on 5xx
//! - [`client_credentials_token`]: server-to-server offline tokens from
//!   the app credentials alone; no retries
//!
//! All engines are stateless: credentials come from the immutable
//! [`AppConfig`](crate::config::AppConfig), tokens are returned to the
//! caller, and nothing is persisted here. Failures are [`TokenFailure`]
//! values carrying a relayable response and the full per-attempt trace.

mod access_token;
mod associated_user;
mod client_credentials;
mod grant;
mod token_exchange;
mod token_refresh;

pub use access_token::{AccessMode, ClientCredentialsAccessToken, TokenExchangeAccessToken};
pub use associated_user::AssociatedUser;
pub use client_credentials::{client_credentials_token, ClientCredentialsOutcome};
pub use grant::TokenFailure;
pub use token_exchange::{exchange_token, TokenExchangeOutcome};
pub use token_refresh::{refresh_access_token, RefreshOutcome};

pub(crate) use grant::product_user_agent;

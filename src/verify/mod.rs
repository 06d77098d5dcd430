//! Inbound request verification.
//!
//! One verifier per embedded-app surface, all consuming the same
//! [`RequestEnvelope`](crate::http::RequestEnvelope) and the same immutable
//! [`AppConfig`](crate::config::AppConfig):
//!
//! - [`verify_webhook_request`] / [`verify_flow_request`]: base64 body-HMAC
//!   surfaces
//! - [`verify_proxy_request`]: hex HMAC over the canonicalized query
//! - [`verify_extension_request`]: bearer ID tokens from checkout,
//!   customer-account, and admin-UI extensions
//! - [`verify_admin_request`]: admin home documents and fetches
//!
//! Every verifier returns `Result<_, Halt>`; a [`Halt`] means "stop and
//! relay the embedded response verbatim". Success values carry the shop
//! identity, the surface's payload, and a result [`LogEntry`].

pub mod hmac;

mod admin;
mod body_hmac;
mod extension;
mod id_token;
mod outcome;
mod proxy;

pub use admin::{verify_admin_request, AdminSession};
pub use body_hmac::{verify_flow_request, verify_webhook_request, BodyVerification};
pub use extension::{
    verify_extension_request, ExtensionSession, ExtensionSurface, RETRY_INVALID_SESSION_HEADER,
};
pub use id_token::{IdToken, IdTokenClaims, IdTokenError};
pub use outcome::{Code, Halt, LogEntry};
pub use proxy::{verify_proxy_request, ProxyVerification};

//! Configuration types for embedded-app authentication.
//!
//! The main types in this module are:
//!
//! - [`AppConfig`]: the immutable credential store threaded through every
//!   verifier and token engine
//! - [`AppConfigBuilder`]: a builder for constructing [`AppConfig`] instances
//! - [`ApiKey`]: a validated client-id newtype
//! - [`ApiSecretKey`]: a validated client-secret newtype with masked debug output
//! - [`ShopDomain`]: a validated shop domain
//! - [`HostUrl`]: a validated endpoint-base override
//! - [`ApiVersion`]: the Admin API version to use
//!
//! # Example
//!
//! ```rust
//! use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, ApiVersion};
//!
//! let config = AppConfig::builder()
//!     .api_key(ApiKey::new("my-client-id").unwrap())
//!     .api_secret_key(ApiSecretKey::new("my-secret").unwrap())
//!     .api_version(ApiVersion::latest())
//!     .build()
//!     .unwrap();
//! ```

mod newtypes;
mod version;

pub(crate) use newtypes::is_valid_shop_label;
pub use newtypes::{ApiKey, ApiSecretKey, HostUrl, ShopDomain};
pub use version::ApiVersion;

use crate::error::ConfigError;

/// Immutable credential store and settings for the app.
///
/// Holds the client id, the active client secret, and optionally the
/// previous client secret. It is read-only after construction, so it can be
/// shared freely across threads and tasks; every operation in this crate
/// takes it by reference instead of reading ambient state.
///
/// # Secret Rotation
///
/// The `old_api_secret_key` field supports zero-downtime secret rotation.
/// Signature checks try the active secret first and fall back to the old
/// one; ID-token decoding tries the old secret first so freshly-rotated
/// tokens keep verifying. Remove the old secret from configuration to
/// finish the rotation.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey};
///
/// let config = AppConfig::builder()
///     .api_key(ApiKey::new("client-id").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .build()
///     .unwrap();
///
/// assert!(config.old_api_secret_key().is_none());
/// ```
#[derive(Clone, Debug)]
pub struct AppConfig {
    api_key: ApiKey,
    api_secret_key: ApiSecretKey,
    old_api_secret_key: Option<ApiSecretKey>,
    api_version: ApiVersion,
    api_host: Option<HostUrl>,
    user_agent_prefix: Option<String>,
}

impl AppConfig {
    /// Creates a new builder for constructing an `AppConfig`.
    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::new()
    }

    /// Returns the API key (client id).
    #[must_use]
    pub const fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Returns the active API secret key.
    #[must_use]
    pub const fn api_secret_key(&self) -> &ApiSecretKey {
        &self.api_secret_key
    }

    /// Returns the previous API secret key, if a rotation is in progress.
    #[must_use]
    pub const fn old_api_secret_key(&self) -> Option<&ApiSecretKey> {
        self.old_api_secret_key.as_ref()
    }

    /// Returns the default Admin API version.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Returns the endpoint-base override, if configured.
    #[must_use]
    pub const fn api_host(&self) -> Option<&HostUrl> {
        self.api_host.as_ref()
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the base URL for a shop's OAuth and Admin endpoints.
    ///
    /// Uses `api_host` when configured, otherwise `https://{shop}`.
    #[must_use]
    pub(crate) fn endpoint_base(&self, shop: &ShopDomain) -> String {
        self.api_host.as_ref().map_or_else(
            || format!("https://{}", shop.as_ref()),
            |host| host.as_ref().to_string(),
        )
    }
}

// Verify AppConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AppConfig>();
};

/// Builder for constructing [`AppConfig`] instances.
///
/// Required fields are `api_key` and `api_secret_key`; everything else has a
/// sensible default (`api_version` defaults to the latest stable release).
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::{AppConfig, ApiKey, ApiSecretKey, ApiVersion, HostUrl};
///
/// let config = AppConfig::builder()
///     .api_key(ApiKey::new("client-id").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .api_version(ApiVersion::V2025_07)
///     .api_host(HostUrl::new("https://proxy.internal").unwrap())
///     .user_agent_prefix("MyApp/1.0")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    api_key: Option<ApiKey>,
    api_secret_key: Option<ApiSecretKey>,
    old_api_secret_key: Option<ApiSecretKey>,
    api_version: Option<ApiVersion>,
    api_host: Option<HostUrl>,
    user_agent_prefix: Option<String>,
}

impl AppConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key (required).
    #[must_use]
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API secret key (required).
    #[must_use]
    pub fn api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.api_secret_key = Some(key);
        self
    }

    /// Sets the previous API secret key for rotation support.
    ///
    /// While configured, signatures and ID tokens minted with either secret
    /// verify; drop it once the rotation completes.
    #[must_use]
    pub fn old_api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.old_api_secret_key = Some(key);
        self
    }

    /// Sets the default Admin API version.
    #[must_use]
    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Sets an endpoint-base override for OAuth and GraphQL calls.
    ///
    /// Intended for proxies and test servers; production apps normally leave
    /// this unset so calls go to `https://{shop}` directly.
    #[must_use]
    pub fn api_host(mut self, host: HostUrl) -> Self {
        self.api_host = Some(host);
        self
    }

    /// Sets the user agent prefix for outbound HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Builds the [`AppConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `api_key` or
    /// `api_secret_key` are not set.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let api_key = self
            .api_key
            .ok_or(ConfigError::MissingRequiredField { field: "api_key" })?;
        let api_secret_key = self
            .api_secret_key
            .ok_or(ConfigError::MissingRequiredField {
                field: "api_secret_key",
            })?;

        Ok(AppConfig {
            api_key,
            api_secret_key,
            old_api_secret_key: self.old_api_secret_key,
            api_version: self.api_version.unwrap_or_else(ApiVersion::latest),
            api_host: self.api_host,
            user_agent_prefix: self.user_agent_prefix,
        })
    }
}

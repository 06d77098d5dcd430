//! Access-token value types.
//!
//! This crate never persists credentials; both token shapes serialize with
//! serde so callers can store them wherever they like and hand them back to
//! the refresh engine or the GraphQL executor later.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::associated_user::AssociatedUser;
use crate::config::ShopDomain;

/// Whether an access token is tied to a specific user or to the app.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// User-specific token; expires and carries an [`AssociatedUser`].
    Online,
    /// App-level token; no user context.
    Offline,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Online => "online",
            Self::Offline => "offline",
        })
    }
}

/// An access token obtained through token exchange (or refresh).
///
/// `user` is populated only for online tokens. The refresh fields are
/// present when the shop issues expiring tokens; the refresh engine uses
/// them to decide between refreshing, short-circuiting, and demanding
/// re-authentication.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenExchangeAccessToken {
    /// Online or offline.
    pub access_mode: AccessMode,
    /// The shop the token belongs to.
    pub shop: ShopDomain,
    /// The access token itself.
    pub token: String,
    /// When the access token expires, if it expires.
    pub expires: Option<DateTime<Utc>>,
    /// Comma-separated granted scopes.
    pub scope: String,
    /// Refresh token, when the shop issues expiring tokens.
    pub refresh_token: Option<String>,
    /// When the refresh token expires.
    pub refresh_token_expires: Option<DateTime<Utc>>,
    /// The user an online token is tied to; `None` for offline tokens.
    pub user: Option<AssociatedUser>,
}

impl TokenExchangeAccessToken {
    /// Returns `true` if the access token expires within `seconds` from now
    /// (or has already expired). Tokens without an expiry never do.
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        self.expires
            .is_some_and(|expires| expires <= Utc::now() + Duration::seconds(seconds))
    }

    /// Returns `true` if the access token is past its expiry.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expires_within(0)
    }

    /// Returns `true` if the refresh token is past its expiry.
    ///
    /// A token without refresh expiry bookkeeping never reports expired
    /// here; the refresh engine handles the missing-refresh-token case
    /// separately.
    #[must_use]
    pub fn refresh_token_expired(&self) -> bool {
        self.refresh_token_expires
            .is_some_and(|expires| expires <= Utc::now())
    }
}

/// An access token obtained through the client-credentials grant.
///
/// Always offline and never carries refresh fields; the platform issues
/// these with a nominal 24-hour lifetime, after which the caller simply
/// requests a new one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientCredentialsAccessToken {
    /// The shop the token belongs to.
    pub shop: ShopDomain,
    /// The access token itself.
    pub token: String,
    /// When the token expires.
    pub expires: Option<DateTime<Utc>>,
    /// Comma-separated granted scopes.
    pub scope: String,
}

impl ClientCredentialsAccessToken {
    /// Client-credentials tokens are always app-level.
    #[must_use]
    pub const fn access_mode() -> AccessMode {
        AccessMode::Offline
    }

    /// Returns `true` if the token is past its expiry.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expires.is_some_and(|expires| expires <= Utc::now())
    }
}

/// Wire shape of the `/admin/oauth/access_token` success body.
#[derive(Debug, Deserialize)]
pub(crate) struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_token_expires_in: Option<i64>,
    #[serde(default)]
    pub associated_user: Option<AssociatedUser>,
    #[serde(default)]
    #[allow(dead_code)] // part of the wire shape; not consumed today
    pub associated_user_scope: Option<String>,
}

impl AccessTokenResponse {
    /// Converts the wire body into a token, stamping expiry times relative
    /// to now.
    pub(crate) fn into_token(
        self,
        access_mode: AccessMode,
        shop: ShopDomain,
    ) -> TokenExchangeAccessToken {
        let now = Utc::now();
        let user = match access_mode {
            AccessMode::Online => self.associated_user,
            AccessMode::Offline => None,
        };
        TokenExchangeAccessToken {
            access_mode,
            shop,
            token: self.access_token,
            expires: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            scope: self.scope,
            refresh_token: self.refresh_token,
            refresh_token_expires: self
                .refresh_token_expires_in
                .map(|secs| now + Duration::seconds(secs)),
            user,
        }
    }
}

// Verify token types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TokenExchangeAccessToken>();
    assert_send_sync::<ClientCredentialsAccessToken>();
};

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_expiry(expires: Option<DateTime<Utc>>) -> TokenExchangeAccessToken {
        TokenExchangeAccessToken {
            access_mode: AccessMode::Offline,
            shop: ShopDomain::new("test-shop").unwrap(),
            token: "shpat_test".to_string(),
            expires,
            scope: "read_products".to_string(),
            refresh_token: None,
            refresh_token_expires: None,
            user: None,
        }
    }

    #[test]
    fn test_access_mode_display() {
        assert_eq!(AccessMode::Online.to_string(), "online");
        assert_eq!(AccessMode::Offline.to_string(), "offline");
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        let token = token_with_expiry(None);
        assert!(!token.expired());
        assert!(!token.expires_within(86_400));
    }

    #[test]
    fn test_expires_within_window() {
        let token = token_with_expiry(Some(Utc::now() + Duration::seconds(30)));
        assert!(!token.expired());
        assert!(token.expires_within(60));
        assert!(!token.expires_within(10));
    }

    #[test]
    fn test_refresh_token_expiry() {
        let mut token = token_with_expiry(None);
        assert!(!token.refresh_token_expired());

        token.refresh_token_expires = Some(Utc::now() - Duration::seconds(5));
        assert!(token.refresh_token_expired());
    }

    #[test]
    fn test_online_response_keeps_user() {
        let response: AccessTokenResponse = serde_json::from_str(
            r#"{
                "access_token": "shpat_online",
                "scope": "read_orders",
                "expires_in": 86400,
                "associated_user_scope": "read_orders",
                "associated_user": {
                    "id": 7,
                    "first_name": "A",
                    "last_name": "B",
                    "email": "a@b.c",
                    "email_verified": true,
                    "account_owner": false,
                    "locale": "en",
                    "collaborator": false
                }
            }"#,
        )
        .unwrap();

        let shop = ShopDomain::new("test-shop").unwrap();
        let token = response.into_token(AccessMode::Online, shop);

        assert_eq!(token.access_mode, AccessMode::Online);
        assert_eq!(token.user.as_ref().unwrap().id, 7);
        assert!(token.expires.is_some());
    }

    #[test]
    fn test_offline_response_drops_user() {
        let response: AccessTokenResponse = serde_json::from_str(
            r#"{
                "access_token": "shpat_offline",
                "scope": "read_orders",
                "associated_user": {
                    "id": 7,
                    "first_name": "A",
                    "last_name": "B",
                    "email": "a@b.c",
                    "email_verified": true,
                    "account_owner": false,
                    "locale": "en",
                    "collaborator": false
                }
            }"#,
        )
        .unwrap();

        let shop = ShopDomain::new("test-shop").unwrap();
        let token = response.into_token(AccessMode::Offline, shop);

        assert!(token.user.is_none());
        assert!(token.expires.is_none());
    }

    #[test]
    fn test_refresh_fields_mapped() {
        let response: AccessTokenResponse = serde_json::from_str(
            r#"{
                "access_token": "shpat_expiring",
                "scope": "read_orders",
                "expires_in": 86400,
                "refresh_token": "shprt_abc",
                "refresh_token_expires_in": 2592000
            }"#,
        )
        .unwrap();

        let shop = ShopDomain::new("test-shop").unwrap();
        let token = response.into_token(AccessMode::Offline, shop);

        assert_eq!(token.refresh_token.as_deref(), Some("shprt_abc"));
        assert!(token.refresh_token_expires.is_some());
    }

    #[test]
    fn test_token_serde_round_trip() {
        let token = token_with_expiry(Some(Utc::now() + Duration::hours(1)));
        let json = serde_json::to_string(&token).unwrap();
        let restored: TokenExchangeAccessToken = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.token, token.token);
        assert_eq!(restored.access_mode, token.access_mode);
    }

    #[test]
    fn test_client_credentials_token_is_offline() {
        assert_eq!(
            ClientCredentialsAccessToken::access_mode(),
            AccessMode::Offline
        );
    }
}

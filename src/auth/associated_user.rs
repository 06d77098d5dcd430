//! Associated user information for online access tokens.

use serde::{Deserialize, Serialize};

/// The merchant user an online access token is tied to.
///
/// Returned by the token-exchange grant in online mode. This is a merchant
/// *user*, not a storefront customer — the proxy verifier's
/// `logged_in_customer_id` belongs to a different identity class.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::AssociatedUser;
///
/// let json = r#"{
///     "id": 12345,
///     "first_name": "Jane",
///     "last_name": "Doe",
///     "email": "jane@example.com",
///     "email_verified": true,
///     "account_owner": true,
///     "locale": "en",
///     "collaborator": false
/// }"#;
/// let user: AssociatedUser = serde_json::from_str(json).unwrap();
/// assert_eq!(user.id, 12345);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedUser {
    /// The user's numeric id.
    pub id: u64,

    /// The user's first name.
    pub first_name: String,

    /// The user's last name.
    pub last_name: String,

    /// The user's email address.
    pub email: String,

    /// Whether the email address has been verified.
    pub email_verified: bool,

    /// Whether the user owns the store.
    pub account_owner: bool,

    /// The user's locale preference (e.g., "en", "fr").
    pub locale: String,

    /// Whether the user is a collaborator.
    pub collaborator: bool,
}

// Verify AssociatedUser is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AssociatedUser>();
};

//! ID-token verification for the embedded admin home surface.
//!
//! Admin home receives two request shapes. "Fetch" requests come from the
//! app-bridge client and carry the ID token as an `Authorization: Bearer`
//! header; they are answered like API calls (401 plus a retry header on
//! failure). "Document" requests are full-page loads inside the admin
//! iframe and carry the token as an `id_token` query parameter; when the
//! token is missing or stale the browser is bounced (302) to a patch page
//! that mints a fresh token and reloads the original path.

use crate::config::{AppConfig, ShopDomain};
use crate::http::{RequestEnvelope, ResponseEnvelope};
use crate::verify::extension::{bearer_token, retry_response, token_halt};
use crate::verify::id_token::{decode_id_token, IdToken};
use crate::verify::outcome::{Code, Halt, LogEntry};

/// Query parameter carrying the ID token on document requests.
const ID_TOKEN_PARAM: &str = "id_token";

/// Query parameter pointing the patch page back at the original path.
const RELOAD_PARAM: &str = "shopify-reload";

/// Script preloaded on embedded document responses.
const APP_BRIDGE_PRELOAD: &str =
    "<https://cdn.shopify.com/shopifycloud/app-bridge.js>; rel=\"preload\"; as=\"script\"";

/// A successfully verified admin home request.
#[derive(Clone, Debug)]
pub struct AdminSession {
    /// The shop the session belongs to.
    pub shop: ShopDomain,
    /// The validated, exchangeable ID token.
    pub id_token: IdToken,
    /// Merchant user id from the token's subject, when numeric.
    pub user_id: Option<u64>,
    /// Prebuilt response that makes the client mint a fresh ID token:
    /// a 302 bounce for document requests, a 401 plus retry header for
    /// fetch requests. Attach it to a later failed downstream API call.
    pub new_id_token_response: ResponseEnvelope,
    /// Top-level result log.
    pub log: LogEntry,
    /// For document requests, a 200 carrying the iframe security headers
    /// (`Content-Security-Policy`, app-bridge `Link` preload) that must be
    /// merged into the page response. Plain 200 for fetch requests.
    pub response: ResponseEnvelope,
}

/// Verifies an admin home request, bouncing document loads with stale
/// tokens to `patch_path`.
///
/// `patch_path` is the app route that mints a fresh ID token client-side;
/// the bounce preserves all other query parameters and adds a
/// `shopify-reload` parameter pointing back at the original path (minus
/// `id_token`) so the flow resumes where it left off.
///
/// # Errors
///
/// Fetch requests halt with `invalid_id_token` / `expired_id_token` /
/// `invalid_aud` (401 plus the retry header). Document requests halt with
/// `redirect_to_patch_id_token_page` (302) instead — browsers can't mint
/// tokens, so they get sent somewhere that can.
pub fn verify_admin_request(
    config: &AppConfig,
    request: &RequestEnvelope,
    patch_path: &str,
) -> Result<AdminSession, Halt> {
    if let Some(token) = bearer_token(request) {
        return verify_fetch_request(config, token);
    }
    verify_document_request(config, request, patch_path)
}

fn verify_fetch_request(config: &AppConfig, token: &str) -> Result<AdminSession, Halt> {
    let id_token = decode_id_token(token, config, true).map_err(|err| token_halt(&err, true))?;
    let shop = id_token.shop().map_err(|err| token_halt(&err, true))?;

    Ok(AdminSession {
        shop,
        user_id: id_token.user_id(),
        id_token,
        new_id_token_response: retry_response(401),
        log: LogEntry::new(Code::Verified, "admin fetch request verified"),
        response: ResponseEnvelope::new(200),
    })
}

fn verify_document_request(
    config: &AppConfig,
    request: &RequestEnvelope,
    patch_path: &str,
) -> Result<AdminSession, Halt> {
    let Some(token) = request.query_param(ID_TOKEN_PARAM) else {
        return Err(bounce_halt(request, patch_path, "document request carried no ID token"));
    };

    let id_token = match decode_id_token(&token, config, true) {
        Ok(id_token) => id_token,
        Err(err) => {
            return Err(bounce_halt(
                request,
                patch_path,
                format!("document ID token rejected ({})", err.reason()),
            ));
        }
    };
    let shop = match id_token.shop() {
        Ok(shop) => shop,
        Err(err) => {
            return Err(bounce_halt(
                request,
                patch_path,
                format!("document ID token rejected ({})", err.reason()),
            ));
        }
    };

    let response = ResponseEnvelope::new(200)
        .with_header(
            "Content-Security-Policy",
            format!(
                "frame-ancestors https://{} https://admin.shopify.com;",
                shop.as_ref()
            ),
        )
        .with_header("Link", APP_BRIDGE_PRELOAD);

    Ok(AdminSession {
        shop,
        user_id: id_token.user_id(),
        id_token,
        new_id_token_response: bounce_redirect(request, patch_path),
        log: LogEntry::new(Code::Verified, "admin document request verified"),
        response,
    })
}

fn bounce_halt(request: &RequestEnvelope, patch_path: &str, detail: impl Into<String>) -> Halt {
    Halt::new(
        Code::RedirectToPatchIdTokenPage,
        detail,
        bounce_redirect(request, patch_path),
    )
}

/// Builds the 302 redirect to the patch-token page.
///
/// Keeps every query parameter except `id_token` (the stale token must not
/// ride along) and appends `shopify-reload` with the original path so the
/// patch page can resume the navigation once a fresh token exists.
fn bounce_redirect(request: &RequestEnvelope, patch_path: &str) -> ResponseEnvelope {
    let surviving: Vec<&str> = request
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| {
            !pair.is_empty()
                && *pair != ID_TOKEN_PARAM
                && !pair.starts_with("id_token=")
        })
        .collect();
    let surviving = surviving.join("&");

    let mut reload_target = request.path().to_string();
    if !surviving.is_empty() {
        reload_target.push('?');
        reload_target.push_str(&surviving);
    }

    let mut location = format!("{patch_path}?");
    if !surviving.is_empty() {
        location.push_str(&surviving);
        location.push('&');
    }
    location.push_str(RELOAD_PARAM);
    location.push('=');
    location.push_str(&urlencoding::encode(&reload_target));

    ResponseEnvelope::new(302).with_header("Location", location)
}

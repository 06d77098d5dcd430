//! Framework-agnostic request and response envelopes.
//!
//! Web frameworks all model requests differently, so every verifier in this
//! crate consumes a plain [`RequestEnvelope`] and produces a plain
//! [`ResponseEnvelope`]. Adapters for a specific framework live with the
//! caller; the envelopes are the only boundary types.
//!
//! Header keys are case-folded once, at construction, so lookups deeper in
//! the call graph never branch on header casing.

use std::collections::{BTreeMap, HashMap};

/// An inbound HTTP request, normalized at the boundary.
///
/// Built with [`RequestEnvelope::builder`]. Header keys are lowercased on
/// insertion and values are kept as multi-valued lists; lookup is therefore
/// case-insensitive with first-value-wins semantics.
///
/// # Example
///
/// ```rust
/// use shopify_app_auth::RequestEnvelope;
///
/// let request = RequestEnvelope::builder("POST", "/webhooks?topic=orders")
///     .header("X-Shopify-Shop-Domain", "test-shop.myshopify.com")
///     .body(r#"{"id":1}"#)
///     .build();
///
/// assert_eq!(request.method(), "POST");
/// assert_eq!(request.header("x-shopify-shop-domain"), Some("test-shop.myshopify.com"));
/// assert_eq!(request.header("X-SHOPIFY-SHOP-DOMAIN"), Some("test-shop.myshopify.com"));
/// assert_eq!(request.path(), "/webhooks");
/// assert_eq!(request.query(), Some("topic=orders"));
/// ```
#[derive(Clone, Debug)]
pub struct RequestEnvelope {
    method: String,
    url: String,
    headers: HashMap<String, Vec<String>>,
    body: Option<String>,
}

impl RequestEnvelope {
    /// Creates a builder for a request with the given method and URL.
    ///
    /// The URL may be absolute (`https://host/path?query`) or just a
    /// path-and-query (`/path?query`).
    #[must_use]
    pub fn builder(method: impl Into<String>, url: impl Into<String>) -> RequestEnvelopeBuilder {
        RequestEnvelopeBuilder {
            method: method.into().to_uppercase(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Returns the HTTP method, uppercased.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request URL as provided.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the first value of a header, looked up case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns all values of a header, looked up case-insensitively.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Option<&[String]> {
        self.headers
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
    }

    /// Returns the raw body, if one was provided.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns the path component of the URL.
    #[must_use]
    pub fn path(&self) -> &str {
        let after_host = self.url.find("://").map_or(self.url.as_str(), |scheme| {
            let rest = &self.url[scheme + 3..];
            rest.find('/').map_or("", |slash| &rest[slash..])
        });
        let end = after_host
            .find(['?', '#'])
            .unwrap_or(after_host.len());
        &after_host[..end]
    }

    /// Returns the raw query string (without the `?`), if present.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        let start = self.url.find('?')? + 1;
        let rest = &self.url[start..];
        let end = rest.find('#').unwrap_or(rest.len());
        Some(&rest[..end])
    }

    /// Returns the first (decoded) value of a query parameter, if present.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        for (key, value) in self.query_pairs() {
            if key == name {
                return Some(value);
            }
        }
        None
    }

    /// Returns all query parameters as decoded `(key, value)` pairs in
    /// document order, duplicates preserved.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(query) = self.query() else {
            return Vec::new();
        };
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect()
    }
}

/// Percent-decodes a query component, treating `+` as a space.
pub(crate) fn decode_component(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map_or(plus_decoded.clone(), |decoded| decoded.into_owned())
}

/// Builder for [`RequestEnvelope`].
#[derive(Debug)]
pub struct RequestEnvelopeBuilder {
    method: String,
    url: String,
    headers: HashMap<String, Vec<String>>,
    body: Option<String>,
}

impl RequestEnvelopeBuilder {
    /// Adds a header value; repeated names accumulate.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.as_ref().to_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// Sets the raw request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Finalizes the envelope.
    #[must_use]
    pub fn build(self) -> RequestEnvelope {
        RequestEnvelope {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// An outbound HTTP response that is always safe to relay verbatim.
///
/// Produced by every failed verification and by the token engines'
/// terminal failures. Headers are kept in an ordered map so relayed
/// responses are deterministic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// HTTP status code.
    pub status: u16,
    /// Response body; empty for most rejections.
    pub body: String,
    /// Response headers in insertion-stable (sorted) order.
    pub headers: BTreeMap<String, String>,
}

impl ResponseEnvelope {
    /// Creates a response with the given status, empty body, no headers.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            headers: BTreeMap::new(),
        }
    }

    /// Sets a header, replacing any existing value.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns a header value by exact name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = RequestEnvelope::builder("post", "/hook")
            .header("X-Shopify-Hmac-SHA256", "abc")
            .build();

        assert_eq!(request.method(), "POST");
        assert_eq!(request.header("x-shopify-hmac-sha256"), Some("abc"));
        assert_eq!(request.header("X-SHOPIFY-HMAC-SHA256"), Some("abc"));
        assert_eq!(request.header("missing"), None);
    }

    #[test]
    fn test_repeated_headers_accumulate() {
        let request = RequestEnvelope::builder("GET", "/")
            .header("Accept", "application/json")
            .header("accept", "text/html")
            .build();

        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.header_values("ACCEPT").unwrap().len(), 2);
    }

    #[test]
    fn test_path_extraction() {
        let absolute = RequestEnvelope::builder("GET", "https://x.test/apps/proxy?a=1").build();
        assert_eq!(absolute.path(), "/apps/proxy");

        let relative = RequestEnvelope::builder("GET", "/apps/proxy?a=1").build();
        assert_eq!(relative.path(), "/apps/proxy");

        let bare = RequestEnvelope::builder("GET", "/apps/proxy").build();
        assert_eq!(bare.path(), "/apps/proxy");
    }

    #[test]
    fn test_query_extraction() {
        let request = RequestEnvelope::builder("GET", "/p?a=1&b=two%20words&b=3").build();
        assert_eq!(request.query(), Some("a=1&b=two%20words&b=3"));
        assert_eq!(request.query_param("a"), Some("1".to_string()));
        assert_eq!(request.query_param("b"), Some("two words".to_string()));
        assert_eq!(request.query_param("c"), None);

        let pairs = request.query_pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2], ("b".to_string(), "3".to_string()));
    }

    #[test]
    fn test_query_decodes_plus_as_space() {
        let request = RequestEnvelope::builder("GET", "/p?msg=hello+world").build();
        assert_eq!(request.query_param("msg"), Some("hello world".to_string()));
    }

    #[test]
    fn test_no_query_returns_none() {
        let request = RequestEnvelope::builder("GET", "/p").build();
        assert_eq!(request.query(), None);
        assert!(request.query_pairs().is_empty());
    }

    #[test]
    fn test_response_envelope_builders() {
        let response = ResponseEnvelope::new(401)
            .with_header("Content-Type", "application/json")
            .with_body("{}");

        assert_eq!(response.status, 401);
        assert_eq!(response.body, "{}");
        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_envelopes_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RequestEnvelope>();
        assert_send_sync::<ResponseEnvelope>();
    }
}

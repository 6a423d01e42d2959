//! Canonical request string construction.
//!
//! The string covered by the MAC is a newline-separated list of:
//!
//! ```text
//! timestamp\n
//! nonce\n
//! HTTPRequestMethod\n
//! path?query\n
//! host\n
//! port\n
//! ext
//! ```
//!
//! There is no trailing newline, the `?` is always present even when the query
//! is empty, and `ext` is the empty string when the client sent none. Client
//! and server must agree on this layout byte for byte.
//!
//! # Port selection
//!
//! The port line carries the effective port of the request: the explicit port
//! in the `Host` header if any, otherwise the port of the request URI
//! authority, otherwise the configured default. The host line never includes
//! a port.

use crate::header::AuthParams;

/// Request metadata handed to the authorization gate by the dispatch layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    /// HTTP method as received.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Raw query string without the leading `?` (empty if none).
    pub query: String,
    /// Host name without port.
    pub host: String,
    /// Effective port.
    pub port: u16,
    /// Raw `Authorization` header value, if present and valid UTF-8.
    pub authorization: Option<String>,
}

impl RequestMeta {
    /// Extract request metadata from HTTP request parts.
    ///
    /// `default_port` is used when neither the `Host` header nor the URI names
    /// a port.
    ///
    /// # Examples
    ///
    /// ```
    /// use tentd_auth::normalize::RequestMeta;
    ///
    /// let (parts, ()) = http::Request::builder()
    ///     .method("GET")
    ///     .uri("/followers/abc?limit=5")
    ///     .header("host", "example.com:8080")
    ///     .body(())
    ///     .unwrap()
    ///     .into_parts();
    ///
    /// let meta = RequestMeta::from_parts(&parts, 80);
    /// assert_eq!(meta.host, "example.com");
    /// assert_eq!(meta.port, 8080);
    /// assert_eq!(meta.query, "limit=5");
    /// ```
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts, default_port: u16) -> Self {
        let host_header = parts
            .headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok());

        let (host, header_port) = match host_header {
            Some(value) => split_host_port(value),
            None => (parts.uri.host().unwrap_or(""), None),
        };

        let port = header_port
            .or_else(|| parts.uri.port_u16())
            .unwrap_or(default_port);

        Self {
            method: parts.method.as_str().to_owned(),
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().unwrap_or("").to_owned(),
            host: host.to_owned(),
            port,
            authorization: parts
                .headers
                .get(http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned),
        }
    }
}

/// Build the canonical request string covered by the MAC.
///
/// # Examples
///
/// ```
/// use tentd_auth::header::AuthParams;
/// use tentd_auth::normalize::{RequestMeta, build_canonical_string};
///
/// let params = AuthParams {
///     id: "h480djs93hd8".to_owned(),
///     ts: "1336363200".to_owned(),
///     nonce: "dj83hs9s".to_owned(),
///     mac: String::new(),
///     ext: None,
/// };
/// let request = RequestMeta {
///     method: "GET".to_owned(),
///     path: "/resource/1".to_owned(),
///     query: "b=1&a=2".to_owned(),
///     host: "example.com".to_owned(),
///     port: 80,
///     authorization: None,
/// };
/// assert_eq!(
///     build_canonical_string(&params, &request),
///     "1336363200\ndj83hs9s\nGET\n/resource/1?b=1&a=2\nexample.com\n80\n"
/// );
/// ```
#[must_use]
pub fn build_canonical_string(params: &AuthParams, request: &RequestMeta) -> String {
    let ext = params.ext.as_deref().unwrap_or("");
    format!(
        "{}\n{}\n{}\n{}?{}\n{}\n{}\n{ext}",
        params.ts, params.nonce, request.method, request.path, request.query, request.host,
        request.port,
    )
}

/// Split a `Host` header value into host name and optional port.
///
/// Bracketed IPv6 literals keep their brackets. A port that does not parse as
/// `u16` is treated as absent.
fn split_host_port(value: &str) -> (&str, Option<u16>) {
    let value = value.trim();

    if value.starts_with('[') {
        return match value.find(']') {
            Some(end) => {
                let port = value[end + 1..]
                    .strip_prefix(':')
                    .and_then(|p| p.parse().ok());
                (&value[..=end], port)
            }
            None => (value, None),
        };
    }

    match value.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().ok()),
        None => (value, None),
    }
}

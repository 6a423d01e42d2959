//! Parsing of the `Authorization: MAC ...` request header.
//!
//! The header has the format:
//!
//! ```text
//! MAC id="<id>", ts="<unix-seconds>", nonce="<token>", mac="<base64>"[, ext="<opaque>"]
//! ```
//!
//! Parameters other than the five above are ignored so that clients sending
//! newer draft parameters still authenticate.

use std::fmt;

use crate::error::AuthError;

/// The authentication scheme literal.
pub const MAC_SCHEME: &str = "MAC";

/// Fields parsed from one request's `Authorization` header.
///
/// All values are kept exactly as sent: the canonical string must be built
/// from the same bytes the client signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthParams {
    /// The MAC key identifier.
    pub id: String,
    /// Request timestamp in seconds since the Unix epoch, as sent.
    pub ts: String,
    /// Client-chosen one-time token.
    pub nonce: String,
    /// Base64-encoded HMAC-SHA256 signature.
    pub mac: String,
    /// Optional application-specific extension data.
    pub ext: Option<String>,
}

impl AuthParams {
    /// Parse the timestamp field.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedHeader`] if `ts` is not an integer.
    pub fn timestamp(&self) -> Result<i64, AuthError> {
        self.ts
            .parse()
            .map_err(|_| AuthError::MalformedHeader("ts is not an integer"))
    }
}

impl fmt::Display for AuthParams {
    /// Render the parameters back into an `Authorization` header value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{MAC_SCHEME} id=\"{}\", ts=\"{}\", nonce=\"{}\", mac=\"{}\"",
            self.id, self.ts, self.nonce, self.mac
        )?;
        if let Some(ext) = &self.ext {
            write!(f, ", ext=\"{ext}\"")?;
        }
        Ok(())
    }
}

/// Parse a raw `Authorization` header value.
///
/// `None` means the header was absent; it is reported the same way as any
/// other unusable header.
///
/// # Errors
///
/// Returns [`AuthError::MalformedHeader`] if the header is absent, uses a
/// scheme other than `MAC`, contains a segment without `=`, repeats a known
/// field, or lacks any of `id`, `ts`, `nonce`, `mac`.
///
/// # Examples
///
/// ```
/// use tentd_auth::header::parse_auth_header;
///
/// let params = parse_auth_header(Some(
///     r#"MAC id="h480djs93hd8", ts="1336363200", nonce="dj83hs9s", mac="Zm9v""#,
/// ))
/// .unwrap();
/// assert_eq!(params.id, "h480djs93hd8");
/// assert!(params.ext.is_none());
/// ```
pub fn parse_auth_header(header: Option<&str>) -> Result<AuthParams, AuthError> {
    let header = header.ok_or(AuthError::MalformedHeader("missing authorization header"))?;

    let rest = header
        .trim()
        .strip_prefix(MAC_SCHEME)
        .ok_or(AuthError::MalformedHeader("unsupported authentication scheme"))?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Err(AuthError::MalformedHeader("unsupported authentication scheme"));
    }

    let mut id = None;
    let mut ts = None;
    let mut nonce = None;
    let mut mac = None;
    let mut ext = None;

    for segment in rest.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (key, value) = segment
            .split_once('=')
            .ok_or(AuthError::MalformedHeader("parameter without '='"))?;
        let value = value.trim().trim_matches('"').to_owned();

        let slot = match key.trim() {
            "id" => &mut id,
            "ts" => &mut ts,
            "nonce" => &mut nonce,
            "mac" => &mut mac,
            "ext" => &mut ext,
            _ => continue,
        };
        if slot.replace(value).is_some() {
            return Err(AuthError::MalformedHeader("duplicate parameter"));
        }
    }

    Ok(AuthParams {
        id: required(id, "missing id")?,
        ts: required(ts, "missing ts")?,
        nonce: required(nonce, "missing nonce")?,
        mac: required(mac, "missing mac")?,
        ext,
    })
}

fn required(value: Option<String>, reason: &'static str) -> Result<String, AuthError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MalformedHeader(reason))
}

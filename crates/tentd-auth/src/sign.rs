//! Client-side request signing.
//!
//! [`RequestSigner`] produces the `Authorization` header a server running the
//! [`AuthorizationGate`](crate::gate::AuthorizationGate) accepts. It shares the
//! canonical string builder with the verifier, so both sides always agree on
//! the wire layout.

use chrono::Utc;

use crate::header::AuthParams;
use crate::keypair::random_hex;
use crate::mac::{compute_mac, encode_mac};
use crate::normalize::{RequestMeta, build_canonical_string};

/// Number of random bytes in a generated nonce.
const NONCE_BYTES: usize = 12;

/// Signs requests with one keypair.
///
/// # Examples
///
/// ```
/// use tentd_auth::normalize::RequestMeta;
/// use tentd_auth::sign::RequestSigner;
///
/// let request = RequestMeta {
///     method: "GET".to_owned(),
///     path: "/followers/abc".to_owned(),
///     query: String::new(),
///     host: "tent.example.com".to_owned(),
///     port: 443,
///     authorization: None,
/// };
/// let signer = RequestSigner::new("abc", "secret");
/// let header = signer.sign(&request, 1_336_363_200, "dj83hs9s", None).to_string();
/// assert!(header.starts_with("MAC id=\"abc\", ts=\"1336363200\", nonce=\"dj83hs9s\""));
/// ```
#[derive(Clone)]
pub struct RequestSigner {
    key_id: String,
    secret: String,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer for the given key id and secret.
    #[must_use]
    pub fn new(key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret: secret.into(),
        }
    }

    /// Sign `request` with an explicit timestamp, nonce, and extension.
    #[must_use]
    pub fn sign(
        &self,
        request: &RequestMeta,
        ts: i64,
        nonce: &str,
        ext: Option<&str>,
    ) -> AuthParams {
        let mut params = AuthParams {
            id: self.key_id.clone(),
            ts: ts.to_string(),
            nonce: nonce.to_owned(),
            mac: String::new(),
            ext: ext.map(ToOwned::to_owned),
        };
        let canonical = build_canonical_string(&params, request);
        params.mac = encode_mac(&compute_mac(self.secret.as_bytes(), &canonical));
        params
    }

    /// Sign `request` with the current time and a fresh random nonce.
    #[must_use]
    pub fn sign_now(&self, request: &RequestMeta) -> AuthParams {
        self.sign(request, Utc::now().timestamp(), &generate_nonce(), None)
    }
}

/// Generate a random nonce, hex encoded.
#[must_use]
pub fn generate_nonce() -> String {
    random_hex::<NONCE_BYTES>()
}

//! Authentication error types.
//!
//! Every failure path of the authorization gate maps to exactly one
//! [`AuthError`] variant. All variants but
//! [`AuthError::RepositoryUnavailable`] are credential problems and collapse
//! into the same challenge response.

/// Errors produced while authenticating a MAC-signed request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing, uses another scheme, or lacks a
    /// required field.
    #[error("malformed authorization header: {0}")]
    MalformedHeader(&'static str),

    /// No keypair exists for the supplied id.
    #[error("unknown MAC key id")]
    UnknownKeyId,

    /// The supplied MAC does not match the expected signature.
    #[error("MAC signature does not match")]
    SignatureMismatch,

    /// The request timestamp lies outside the freshness window.
    #[error("request timestamp outside the freshness window")]
    ExpiredTimestamp,

    /// The `(key id, nonce)` pair was already used within the freshness window.
    #[error("nonce already used for this key")]
    ReplayedNonce,

    /// The key id already holds its quota of remembered nonces.
    #[error("nonce history full for this key")]
    NonceCacheFull,

    /// The keypair repository could not be reached.
    #[error("keypair repository unavailable: {0}")]
    RepositoryUnavailable(#[from] RepositoryError),
}

impl AuthError {
    /// Short, stable label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedHeader(_) => "malformed_header",
            Self::UnknownKeyId => "unknown_key_id",
            Self::SignatureMismatch => "signature_mismatch",
            Self::ExpiredTimestamp => "expired_timestamp",
            Self::ReplayedNonce => "replayed_nonce",
            Self::NonceCacheFull => "nonce_cache_full",
            Self::RepositoryUnavailable(_) => "repository_unavailable",
        }
    }

    /// Whether this error is an operational failure rather than a credential
    /// problem.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::RepositoryUnavailable(_))
    }

    /// HTTP status code the caller should see for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        if self.is_operational() {
            http::StatusCode::SERVICE_UNAVAILABLE
        } else {
            http::StatusCode::UNAUTHORIZED
        }
    }
}

/// Errors raised by a [`KeyPairRepository`](crate::keypair::KeyPairRepository)
/// backend.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Could not find a free key id after repeated attempts.
    #[error("no unique key id found after {attempts} attempts")]
    IdSpaceExhausted {
        /// Number of ids that were tried.
        attempts: usize,
    },

    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

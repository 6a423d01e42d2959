//! HTTP API error type.
//!
//! Errors are rendered as JSON:
//!
//! ```json
//! { "error": "NotFound", "message": "Follower not found" }
//! ```

use std::fmt;

/// Error codes returned by the tentd HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    /// The request body or parameters are invalid.
    BadRequest,
    /// No such resource.
    NotFound,
    /// The path exists but not for this method.
    MethodNotAllowed,
    /// A backing service is unavailable.
    ServiceUnavailable,
    /// Unexpected server failure.
    InternalError,
}

impl ApiErrorCode {
    /// Returns the error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BadRequest",
            Self::NotFound => "NotFound",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::InternalError => "InternalError",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::BadRequest => http::StatusCode::BAD_REQUEST,
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::ServiceUnavailable => http::StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An API error response.
#[derive(Debug)]
pub struct ApiError {
    /// The error code.
    pub code: ApiErrorCode,
    /// A human-readable error message.
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Create a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        self.code.status_code()
    }

    /// Invalid request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::BadRequest, message)
    }

    /// Resource not found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::NotFound, message)
    }

    /// Method not allowed on a known path.
    #[must_use]
    pub fn method_not_allowed(method: &http::Method, path: &str) -> Self {
        Self::with_message(
            ApiErrorCode::MethodNotAllowed,
            format!("Method {method} not allowed on {path}"),
        )
    }

    /// Backing service unavailable.
    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::ServiceUnavailable, message)
    }

    /// Internal server error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::InternalError, message)
    }
}

impl From<tentd_auth::RepositoryError> for ApiError {
    fn from(err: tentd_auth::RepositoryError) -> Self {
        Self::service_unavailable(format!("Keypair storage unavailable: {err}"))
    }
}

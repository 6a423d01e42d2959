//! Response construction: JSON payloads, API errors, and MAC challenges.

use bytes::Bytes;
use http_body_util::Full;
use tentd_auth::Rejection;
use tentd_auth::gate::{CHALLENGE_BODY, CHALLENGE_SCHEME};

use crate::error::ApiError;

/// Content type for JSON responses.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type for the challenge body.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Serialize an API error into its JSON body.
#[must_use]
pub fn error_to_json(error: &ApiError) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "error": error.code.as_str(),
        "message": error.message,
    }))
    .expect("JSON serialization of error cannot fail")
}

/// Convert an [`ApiError`] into a complete HTTP error response.
#[must_use]
pub fn error_to_response(error: &ApiError) -> http::Response<Full<Bytes>> {
    http::Response::builder()
        .status(error.status_code())
        .header(http::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(Full::new(Bytes::from(error_to_json(error))))
        .expect("valid error response")
}

/// The 401 response every credential failure collapses to.
#[must_use]
pub fn challenge_response() -> http::Response<Full<Bytes>> {
    http::Response::builder()
        .status(http::StatusCode::UNAUTHORIZED)
        .header(http::header::WWW_AUTHENTICATE, CHALLENGE_SCHEME)
        .header(http::header::CONTENT_TYPE, TEXT_CONTENT_TYPE)
        .body(Full::new(Bytes::from_static(CHALLENGE_BODY.as_bytes())))
        .expect("valid challenge response")
}

/// Render a gate rejection.
///
/// Credential failures get the uniform challenge; an unavailable repository
/// gets a 503 JSON error without a challenge.
#[must_use]
pub fn rejection_to_response(rejection: &Rejection) -> http::Response<Full<Bytes>> {
    if rejection.is_challenge() {
        challenge_response()
    } else {
        error_to_response(&ApiError::service_unavailable(
            "Keypair storage is unavailable",
        ))
    }
}

/// Build a JSON response with the given status.
#[must_use]
pub fn json_response(
    status: http::StatusCode,
    value: &serde_json::Value,
) -> http::Response<Full<Bytes>> {
    let json = serde_json::to_vec(value).expect("JSON serialization of a Value cannot fail");
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(Full::new(Bytes::from(json)))
        .expect("valid JSON response")
}

/// Build a 200 response with an empty body.
#[must_use]
pub fn empty_response() -> http::Response<Full<Bytes>> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .body(Full::new(Bytes::new()))
        .expect("valid empty response")
}

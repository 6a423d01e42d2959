//! tentd request router.
//!
//! Routes are resolved from method and path only:
//!
//! ```text
//! POST   /followers        Follow
//! GET    /followers/{id}   GetFollower     (MAC)
//! DELETE /followers/{id}   DeleteFollower  (MAC)
//! GET    /health           Health
//! ```

use std::fmt;

use crate::error::ApiError;

/// An operation the tentd HTTP API can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TentdOperation {
    /// Register a follower and issue its keypair.
    Follow,
    /// Read the caller's own follower record.
    GetFollower {
        /// Follower (keypair) id from the path.
        id: String,
    },
    /// Revoke the caller's own keypair.
    DeleteFollower {
        /// Follower (keypair) id from the path.
        id: String,
    },
    /// Liveness probe.
    Health,
}

impl TentdOperation {
    /// Operation name for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "Follow",
            Self::GetFollower { .. } => "GetFollower",
            Self::DeleteFollower { .. } => "DeleteFollower",
            Self::Health => "Health",
        }
    }

    /// Whether the request must pass the authorization gate first.
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::GetFollower { .. } | Self::DeleteFollower { .. })
    }
}

impl fmt::Display for TentdOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve an operation from the request method and path.
///
/// # Errors
///
/// Returns `NotFound` for unknown paths and `MethodNotAllowed` when the path
/// exists but not for `method`.
pub fn resolve_operation(method: &http::Method, path: &str) -> Result<TentdOperation, ApiError> {
    let segments: Vec<&str> = path
        .trim_start_matches('/')
        .trim_end_matches('/')
        .split('/')
        .collect();

    match segments.as_slice() {
        ["followers"] => match *method {
            http::Method::POST => Ok(TentdOperation::Follow),
            _ => Err(ApiError::method_not_allowed(method, path)),
        },
        ["followers", id] if !id.is_empty() => match *method {
            http::Method::GET => Ok(TentdOperation::GetFollower {
                id: (*id).to_owned(),
            }),
            http::Method::DELETE => Ok(TentdOperation::DeleteFollower {
                id: (*id).to_owned(),
            }),
            _ => Err(ApiError::method_not_allowed(method, path)),
        },
        ["health"] => match *method {
            http::Method::GET => Ok(TentdOperation::Health),
            _ => Err(ApiError::method_not_allowed(method, path)),
        },
        _ => Err(ApiError::not_found(format!("No route for {path}"))),
    }
}

//! Error types for the tentd core.

/// Core error type for tentd infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum TentdError {
    /// Invalid entity identifier.
    #[error("invalid entity: {0} (must be an http or https URL)")]
    InvalidEntity(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for tentd operations.
pub type TentdResult<T> = Result<T, TentdError>;

//! Identity types shared across tentd crates.

use std::fmt;

/// Reference to a Tent entity.
///
/// Entities are identified by their canonical URL. The authentication core
/// only needs this reference to scope a keypair to its owner; entity schema
/// details live in the surrounding persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityRef(String);

impl EntityRef {
    /// Create a new entity reference from its URL.
    ///
    /// A single trailing slash is dropped so `https://a.example/` and
    /// `https://a.example` name the same entity.
    ///
    /// # Errors
    /// Returns an error if the value is not an `http://` or `https://` URL with
    /// a non-empty host part.
    pub fn new(url: impl Into<String>) -> Result<Self, crate::TentdError> {
        let url = url.into();
        let trimmed = url.trim();
        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"));
        match rest {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => {
                let normalized = trimmed.strip_suffix('/').unwrap_or(trimmed);
                Ok(Self(normalized.to_owned()))
            }
            _ => Err(crate::TentdError::InvalidEntity(url)),
        }
    }

    /// Get the entity URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityRef {
    type Error = crate::TentdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityRef> for String {
    fn from(value: EntityRef) -> Self {
        value.0
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

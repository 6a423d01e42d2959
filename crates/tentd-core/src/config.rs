//! Configuration management for tentd.
//!
//! All configuration is driven by environment variables. Unset variables fall
//! back to the defaults in [`TentdConfig::default`].

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{TentdError, TentdResult};

/// Global configuration for tentd.
///
/// # Examples
///
/// ```
/// use tentd_core::TentdConfig;
///
/// let config = TentdConfig::builder().freshness_window_secs(60).build();
/// assert_eq!(config.freshness_window_secs, 60);
/// assert_eq!(config.default_port, 80);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct TentdConfig {
    /// Bind address for the HTTP server.
    #[builder(default = String::from("0.0.0.0:5000"))]
    pub listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Maximum distance, in seconds, between a request timestamp and the
    /// server clock before the request is rejected as stale.
    #[builder(default = 300)]
    pub freshness_window_secs: u64,

    /// Maximum number of live nonces remembered per key id for replay detection.
    #[builder(default = 100_000)]
    pub nonce_cache_capacity: usize,

    /// Port signed into the canonical string when neither the `Host` header
    /// nor the request URI carries one.
    #[builder(default = 80)]
    pub default_port: u16,
}

impl Default for TentdConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TentdConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `TENTD_LISTEN` | `listen` |
    /// | `LOG_LEVEL` | `log_level` |
    /// | `TENTD_FRESHNESS_WINDOW_SECS` | `freshness_window_secs` |
    /// | `TENTD_NONCE_CACHE_CAPACITY` | `nonce_cache_capacity` |
    /// | `TENTD_DEFAULT_PORT` | `default_port` |
    ///
    /// # Errors
    /// Returns [`TentdError::Config`] if a numeric variable cannot be parsed.
    pub fn from_env() -> TentdResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = env::var("TENTD_LISTEN") {
            config.listen = v;
        }
        if let Ok(v) = env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = env_parse("TENTD_FRESHNESS_WINDOW_SECS")? {
            config.freshness_window_secs = v;
        }
        if let Some(v) = env_parse("TENTD_NONCE_CACHE_CAPACITY")? {
            config.nonce_cache_capacity = v;
        }
        if let Some(v) = env_parse("TENTD_DEFAULT_PORT")? {
            config.default_port = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    /// Returns [`TentdError::Config`] when the freshness window or the nonce
    /// cache capacity is zero.
    pub fn validate(&self) -> TentdResult<()> {
        if self.freshness_window_secs == 0 {
            return Err(TentdError::Config(
                "TENTD_FRESHNESS_WINDOW_SECS must be greater than zero".to_owned(),
            ));
        }
        if self.nonce_cache_capacity == 0 {
            return Err(TentdError::Config(
                "TENTD_NONCE_CACHE_CAPACITY must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> TentdResult<Option<T>> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> TentdResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| TentdError::Config(format!("invalid value for {key}: {raw:?}")))
}

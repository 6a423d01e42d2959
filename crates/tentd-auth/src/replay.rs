//! Replay protection: timestamp freshness and nonce history.
//!
//! A signed request is accepted at most once. Its timestamp must lie within
//! the freshness window around the server clock, and its `(key id, nonce)`
//! pair must not have been seen while that timestamp could still be accepted.
//!
//! Nonce expiry is derived from the request timestamp on the same Unix clock
//! the freshness check uses: a nonce signed at `ts` is remembered while
//! `ts + window >= now`, which is exactly as long as `ts` stays fresh.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::AuthError;

/// Check that `ts` lies within `window_secs` of `now` (both Unix seconds).
///
/// # Errors
///
/// Returns [`AuthError::ExpiredTimestamp`] if the distance exceeds the window.
///
/// # Examples
///
/// ```
/// use tentd_auth::replay::check_freshness;
///
/// assert!(check_freshness(1_000, 1_200, 300).is_ok());
/// assert!(check_freshness(1_000, 1_301, 300).is_err());
/// ```
pub fn check_freshness(ts: i64, now: i64, window_secs: u64) -> Result<(), AuthError> {
    if ts.abs_diff(now) > window_secs {
        return Err(AuthError::ExpiredTimestamp);
    }
    Ok(())
}

/// Thread-safe nonce history, bounded per key id.
///
/// Each key id owns its own set of remembered nonces, so one keypair using up
/// its quota never affects another.
#[derive(Debug)]
pub struct NonceCache {
    /// Key id to `nonce -> last Unix second the nonce must stay remembered`.
    seen: DashMap<String, HashMap<String, i64>>,
    window_secs: i64,
    per_key_capacity: usize,
}

impl NonceCache {
    /// Create a cache for a freshness window, remembering at most
    /// `per_key_capacity` live nonces for each key id.
    #[must_use]
    pub fn new(window: Duration, per_key_capacity: usize) -> Self {
        Self {
            seen: DashMap::new(),
            window_secs: i64::try_from(window.as_secs()).unwrap_or(i64::MAX),
            per_key_capacity,
        }
    }

    /// Record the nonce of a request signed at `ts`, checked at `now`.
    ///
    /// The check and the insert happen under the lock of the map shard that
    /// holds the key id, so two concurrent calls with the same pair cannot
    /// both succeed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ReplayedNonce`] if the pair is still remembered,
    /// or [`AuthError::NonceCacheFull`] if this key id already holds its
    /// quota of live nonces.
    pub fn check_and_record(
        &self,
        key_id: &str,
        nonce: &str,
        ts: i64,
        now: i64,
    ) -> Result<(), AuthError> {
        let mut nonces = self.seen.entry(key_id.to_owned()).or_default();

        if let Some(&remember_until) = nonces.get(nonce) {
            if remember_until >= now {
                debug!(key_id, "nonce replayed");
                return Err(AuthError::ReplayedNonce);
            }
        }

        if nonces.len() >= self.per_key_capacity {
            nonces.retain(|_, remember_until| *remember_until >= now);
            if nonces.len() >= self.per_key_capacity {
                warn!(
                    key_id,
                    capacity = self.per_key_capacity,
                    "nonce quota exhausted for key, refusing request"
                );
                return Err(AuthError::NonceCacheFull);
            }
        }

        nonces.insert(nonce.to_owned(), ts.saturating_add(self.window_secs));
        Ok(())
    }

    /// Drop every expired entry against the current clock.
    pub fn purge_expired(&self) {
        self.purge_expired_at(Utc::now().timestamp());
    }

    /// Drop every entry that can no longer match a fresh request at `now`.
    pub fn purge_expired_at(&self, now: i64) {
        self.seen.retain(|_, nonces| {
            nonces.retain(|_, remember_until| *remember_until >= now);
            !nonces.is_empty()
        });
    }

    /// Number of remembered pairs, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.iter().map(|entry| entry.value().len()).sum()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

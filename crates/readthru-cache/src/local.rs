//! In-process fallback store used while the cache backend is unreachable.
//!
//! Entries expire passively: an expired entry stays in the map until it is
//! overwritten or deleted, but is never returned by [`LocalStore::get`].
//! There is no capacity bound.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// TTL reported for a key that exists but has expired.
pub const TTL_EXPIRED: i64 = -1;

/// TTL reported for a key that was never set.
pub const TTL_MISSING: i64 = -2;

/// A serialized value with its absolute expiry.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: Arc<str>,
    pub expires_at: Instant,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` from now.
    pub fn new(value: impl Into<Arc<str>>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }

    /// Whole seconds left before expiry, or [`TTL_EXPIRED`].
    pub fn remaining_secs(&self) -> i64 {
        let remaining = self
            .expires_at
            .saturating_duration_since(Instant::now())
            .as_secs() as i64;
        if remaining > 0 { remaining } else { TTL_EXPIRED }
    }
}

/// Process-wide key/value map with per-entry expiry.
///
/// Cloning is cheap and clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct LocalStore {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` for `ttl_secs` seconds, replacing any previous entry.
    pub fn set(&self, key: &str, value: impl Into<Arc<str>>, ttl_secs: u64) {
        self.entries.insert(
            key.to_string(),
            CacheEntry::new(value, Duration::from_secs(ttl_secs)),
        );
        tracing::trace!(key = %key, ttl_secs, "local cache set");
    }

    /// Get a live value. Expired entries are reported as absent but left in place.
    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Remaining lifetime in seconds, [`TTL_EXPIRED`] or [`TTL_MISSING`].
    pub fn ttl(&self, key: &str) -> i64 {
        match self.entries.get(key) {
            Some(entry) => entry.remaining_secs(),
            None => TTL_MISSING,
        }
    }

    /// Remove an entry. Returns `true` if one was present.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Number of physically present entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

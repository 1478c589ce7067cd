//! Cache-aside read-through facade.
//!
//! ## Lookup order
//!
//! ```text
//! read_through(key)
//!   ├─ backend reachable ── GET ──▶ hit ──▶ TTL ──▶ value (cacheHit: true)
//!   │                        │
//!   │                        └─ error ──▶ local store ──▶ hit / miss
//!   ├─ backend unavailable ───────────▶ local store ──▶ hit / miss
//!   └─ miss ──▶ origin ──▶ SETEX (if reachable) + local mirror ──▶ value (cacheHit: false)
//! ```
//!
//! Backend failures never reach the caller; they are logged and counted.
//! Origin failures always do, and are never masked by stale data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

use crate::connection::{BackendHandle, ConnectionManager, ConnectionStatus};
use crate::error::CacheError;
use crate::local::{LocalStore, TTL_EXPIRED};
use crate::metrics::{self, HitTier};
use crate::CacheResult;

/// TTL applied when the caller does not supply one.
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Provenance of a value returned by [`ReadThroughCache::read_through`].
///
/// Produced once per call and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub cache_hit: bool,
    /// Remaining lifetime on a hit; `-1` when the entry is already expiring.
    #[serde(rename = "ttl", default, skip_serializing_if = "Option::is_none")]
    pub remaining_ttl_seconds: Option<i64>,
    pub elapsed_millis: u64,
}

impl CacheMetadata {
    pub fn hit(remaining_ttl_seconds: i64, elapsed_millis: u64) -> Self {
        Self {
            cache_hit: true,
            remaining_ttl_seconds: Some(remaining_ttl_seconds),
            elapsed_millis,
        }
    }

    pub fn miss(elapsed_millis: u64) -> Self {
        Self {
            cache_hit: false,
            remaining_ttl_seconds: None,
            elapsed_millis,
        }
    }
}

/// A value together with its cache provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse<T> {
    pub data: T,
    pub cache: CacheMetadata,
}

/// Normalize a backend TTL reply: zero or negative means expired.
pub fn normalize_ttl(raw: i64) -> i64 {
    if raw > 0 { raw } else { TTL_EXPIRED }
}

/// Cache-aside orchestrator over the shared backend connection and the local store.
///
/// Concurrent misses on the same key are not coalesced: each caller fetches
/// from the origin and writes the cache, and the last write wins.
#[derive(Clone)]
pub struct ReadThroughCache {
    connections: Arc<ConnectionManager>,
    local: LocalStore,
    default_ttl_secs: u64,
}

impl ReadThroughCache {
    pub fn new(connections: Arc<ConnectionManager>, local: LocalStore) -> Self {
        Self {
            connections,
            local,
            default_ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    #[must_use]
    pub fn with_default_ttl(mut self, ttl_secs: u64) -> Self {
        self.default_ttl_secs = ttl_secs.max(1);
        self
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn backend_status(&self) -> ConnectionStatus {
        self.connections.status()
    }

    /// [`read_through_with_ttl`](Self::read_through_with_ttl) with the default TTL.
    pub async fn read_through<T, E, F, Fut>(
        &self,
        key: &str,
        origin: F,
    ) -> Result<CachedResponse<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.read_through_with_ttl(key, self.default_ttl_secs, origin)
            .await
    }

    /// Resolve `key` from the cache, calling `origin` and repopulating on a miss.
    ///
    /// # Errors
    ///
    /// Returns the origin's error unchanged when the value was not cached and
    /// `origin` failed. Cache backend errors are never returned.
    pub async fn read_through_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        origin: F,
    ) -> Result<CachedResponse<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let ttl_secs = ttl_secs.max(1);

        let mut backend = match self.connections.acquire().await {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache backend unavailable, using local store");
                metrics::record_backend_unavailable();
                None
            }
        };

        let backend_lookup = match &backend {
            Some(handle) => Some(self.backend_lookup::<T>(handle, key).await),
            None => None,
        };
        let cached = match backend_lookup {
            Some(Ok(found)) => found,
            Some(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "Cache GET failed, using local store");
                if let Some(handle) = backend.take() {
                    self.connections.report_failure(&handle, &e);
                }
                self.local_lookup(key)
            }
            None => self.local_lookup(key),
        };

        if let Some((data, ttl, tier)) = cached {
            let elapsed = started.elapsed();
            tracing::debug!(key = %key, tier = tier.as_str(), ttl, "cache hit");
            metrics::record_cache_hit(tier);
            metrics::record_read_duration(true, elapsed);
            return Ok(CachedResponse {
                data,
                cache: CacheMetadata::hit(ttl, elapsed.as_millis() as u64),
            });
        }

        tracing::debug!(key = %key, "cache miss");
        metrics::record_cache_miss();

        let data = origin().await?;
        self.store(key, &data, ttl_secs, backend.as_ref()).await;

        let elapsed = started.elapsed();
        metrics::record_read_duration(false, elapsed);
        Ok(CachedResponse {
            data,
            cache: CacheMetadata::miss(elapsed.as_millis() as u64),
        })
    }

    /// Run one backend command under the policy's command timeout.
    async fn bounded<R>(&self, command: impl Future<Output = CacheResult<R>>) -> CacheResult<R> {
        let limit = self.connections.policy().command_timeout;
        tokio::time::timeout(limit, command)
            .await
            .unwrap_or_else(|_| Err(CacheError::timeout(limit)))
    }

    async fn backend_lookup<T: DeserializeOwned>(
        &self,
        handle: &BackendHandle,
        key: &str,
    ) -> Result<Option<(T, i64, HitTier)>, CacheError> {
        let Some(raw) = self.bounded(handle.store().get(key)).await? else {
            return Ok(None);
        };
        let Some(value) = decode::<T>(key, &raw) else {
            return Ok(None);
        };
        let ttl = self.backend_ttl(handle, key).await;
        Ok(Some((value, ttl, HitTier::Backend)))
    }

    fn local_lookup<T: DeserializeOwned>(&self, key: &str) -> Option<(T, i64, HitTier)> {
        let raw = self.local.get(key)?;
        let value = decode::<T>(key, &raw)?;
        Some((value, normalize_ttl(self.local.ttl(key)), HitTier::Local))
    }

    async fn backend_ttl(&self, handle: &BackendHandle, key: &str) -> i64 {
        match self.bounded(handle.store().ttl(key)).await {
            Ok(raw) => normalize_ttl(raw),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache TTL failed, using local store");
                self.connections.report_failure(handle, &e);
                normalize_ttl(self.local.ttl(key))
            }
        }
    }

    async fn store<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        ttl_secs: u64,
        backend: Option<&BackendHandle>,
    ) {
        let encoded = match serde_json::to_string(data) {
            Ok(encoded) => encoded,
            Err(e) => {
                let e = CacheError::from(e);
                tracing::warn!(key = %key, error = %e, "Failed to encode value, not caching");
                return;
            }
        };

        if let Some(handle) = backend {
            match self.bounded(handle.store().set_ex(key, &encoded, ttl_secs)).await {
                Ok(()) => tracing::debug!(key = %key, ttl_secs, "cache set"),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Cache SETEX failed, keeping local copy only");
                    self.connections.report_failure(handle, &e);
                }
            }
        }

        self.local.set(key, encoded, ttl_secs);
    }
}

impl std::fmt::Debug for ReadThroughCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("connections", &self.connections)
            .field("local_entries", &self.local.len())
            .field("default_ttl_secs", &self.default_ttl_secs)
            .finish()
    }
}

/// Malformed payloads are reported and treated as a miss.
fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            let e = CacheError::from(e);
            tracing::warn!(key = %key, error = %e, "Discarding malformed cached value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ttl() {
        assert_eq!(normalize_ttl(42), 42);
        assert_eq!(normalize_ttl(0), -1);
        assert_eq!(normalize_ttl(-1), -1);
        assert_eq!(normalize_ttl(-2), -1);
    }

    #[test]
    fn test_metadata_serialization() {
        let hit = serde_json::to_value(CacheMetadata::hit(59, 3)).unwrap();
        assert_eq!(
            hit,
            serde_json::json!({"cacheHit": true, "ttl": 59, "elapsedMillis": 3})
        );

        let miss = serde_json::to_value(CacheMetadata::miss(120)).unwrap();
        assert_eq!(
            miss,
            serde_json::json!({"cacheHit": false, "elapsedMillis": 120})
        );
    }

    #[test]
    fn test_decode_malformed_is_none() {
        assert_eq!(decode::<Vec<u32>>("users", "[1,2"), None);
        assert_eq!(decode::<Vec<u32>>("users", "[1,2]"), Some(vec![1, 2]));
    }
}

//! # readthru-cache
//!
//! Cache-aside read-through layer in front of a remote data source.
//!
//! ## Architecture
//!
//! ```text
//! ReadThroughCache (facade)
//!   ├── ConnectionManager  <- one lazily established backend connection, shared
//!   │     └── Connector    <- RedisConnector in production
//!   └── LocalStore         <- in-process fallback while the backend is down
//! ```
//!
//! ## Graceful Degradation
//!
//! If the backend is unreachable (missing URL, connect failure, runtime
//! error), reads and writes go to the [`LocalStore`] and a warning is logged.
//! Callers only ever see origin errors.
//!
//! ## Example
//!
//! ```ignore
//! use readthru_cache::{ConnectPolicy, ConnectionManager, LocalStore, ReadThroughCache, RedisConnector};
//! use std::sync::Arc;
//!
//! let connector = Arc::new(RedisConnector::new(std::env::var("REDIS_URL").ok()));
//! let connections = Arc::new(ConnectionManager::new(connector, ConnectPolicy::default()));
//! let cache = ReadThroughCache::new(connections, LocalStore::new());
//!
//! let users = cache.read_through("users", || origin.users()).await?;
//! println!("hit: {}", users.cache.cache_hit);
//! ```

pub mod connection;
pub mod error;
pub mod facade;
pub mod local;
pub mod metrics;
pub mod probe;
pub mod store;

pub use connection::{BackendHandle, ConnectPolicy, ConnectionManager, ConnectionStatus};
pub use error::CacheError;
pub use facade::{CacheMetadata, CachedResponse, DEFAULT_TTL_SECS, ReadThroughCache, normalize_ttl};
pub use local::{CacheEntry, LocalStore, TTL_EXPIRED, TTL_MISSING};
pub use probe::{LatencyComparison, compare_latency};
pub use store::{CacheStore, Connector, DynStore, RedisConnector, RedisStore, redact_url};

/// Type alias for a cache result.
pub type CacheResult<T> = Result<T, CacheError>;

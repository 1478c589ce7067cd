//! Cache error types.
//!
//! None of these reach callers of the read-through facade: every variant is
//! recovered locally by degrading to the fallback store or treating the
//! lookup as a miss. They are surfaced by the lower-level APIs
//! ([`ConnectionManager::acquire`](crate::ConnectionManager::acquire),
//! [`CacheStore`](crate::CacheStore)) and in log events.

/// Errors that can occur while talking to the cache backend.
///
/// `Clone` because the outcome of a single connection attempt is shared by
/// every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Required backend configuration is missing or invalid.
    #[error("Cache configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// Failed to open or verify a connection to the backend.
    #[error("Cache connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// A backend operation did not complete in time.
    #[error("Cache operation timed out after {millis}ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        millis: u64,
    },

    /// The backend rejected or failed a command.
    #[error("Cache backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// A value could not be encoded for, or decoded from, the cache.
    #[error("Cache serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },
}

impl CacheError {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::Timeout {
            millis: after.as_millis() as u64,
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether another connection attempt may succeed.
    ///
    /// Configuration problems do not go away by retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Configuration { .. })
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            Self::connection(err.to_string())
        } else {
            Self::backend(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

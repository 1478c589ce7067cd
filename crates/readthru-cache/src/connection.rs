//! Lazily established, shared connection to the cache backend.
//!
//! ## State machine
//!
//! ```text
//! Unconnected ──acquire──▶ Connecting ──ok──▶ Ready
//!      ▲                       │                │
//!      │                       └──err──▶ Failed │
//!      └──────────── report_failure ────────────┘
//! ```
//!
//! At most one establishment attempt is in flight at a time. Callers that
//! arrive while it runs await the same shared future. `Failed` is not sticky:
//! the next [`ConnectionManager::acquire`] starts a fresh attempt.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::error::CacheError;
use crate::store::{Connector, DynStore};
use crate::CacheResult;

/// Retry and timeout policy for establishing a connection.
#[derive(Debug, Clone)]
pub struct ConnectPolicy {
    /// Upper bound for one connect-and-ping attempt (default: 10 seconds).
    pub connect_timeout: Duration,

    /// Attempts made before giving up (default: 3).
    pub max_attempts: u32,

    /// Backoff grows by this much per failed attempt (default: 50ms).
    pub retry_step: Duration,

    /// Backoff ceiling (default: 2 seconds).
    pub retry_cap: Duration,

    /// Upper bound for one command on a ready connection (default: 2 seconds).
    pub command_timeout: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_step: Duration::from_millis(50),
            retry_cap: Duration::from_secs(2),
            command_timeout: Duration::from_secs(2),
        }
    }
}

impl ConnectPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, step: Duration, cap: Duration) -> Self {
        self.retry_step = step;
        self.retry_cap = cap;
        self
    }

    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_step.saturating_mul(attempt).min(self.retry_cap)
    }
}

/// A live backend connection tagged with the attempt that produced it.
#[derive(Clone)]
pub struct BackendHandle {
    store: DynStore,
    generation: u64,
}

impl BackendHandle {
    pub fn store(&self) -> &DynStore {
        &self.store
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("provider", &self.store.provider_name())
            .field("generation", &self.generation)
            .finish()
    }
}

type SharedAttempt = Shared<BoxFuture<'static, CacheResult<BackendHandle>>>;

enum ConnectionState {
    Unconnected,
    Connecting {
        generation: u64,
        attempt: SharedAttempt,
    },
    Ready(BackendHandle),
    Failed,
}

/// Observable summary of the connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Unconnected,
    Connecting,
    Ready,
    Failed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconnected => "unconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Inner {
    state: ConnectionState,
    last_generation: u64,
}

/// Owns the single shared backend connection.
///
/// Meant to be created once and injected (behind an `Arc`) wherever the
/// backend is needed.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    policy: ConnectPolicy,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, policy: ConnectPolicy) -> Self {
        Self {
            connector,
            policy,
            inner: Mutex::new(Inner {
                state: ConnectionState::Unconnected,
                last_generation: 0,
            }),
        }
    }

    pub fn policy(&self) -> &ConnectPolicy {
        &self.policy
    }

    /// Return the live handle, joining or starting an establishment attempt if needed.
    ///
    /// # Errors
    ///
    /// Returns the error of the establishment attempt this call waited on when
    /// the backend could not be reached.
    pub async fn acquire(&self) -> CacheResult<BackendHandle> {
        let (generation, attempt) = {
            let mut inner = self.inner.lock();
            let in_flight = match &inner.state {
                ConnectionState::Ready(handle) => return Ok(handle.clone()),
                ConnectionState::Connecting {
                    generation,
                    attempt,
                } => Some((*generation, attempt.clone())),
                ConnectionState::Unconnected | ConnectionState::Failed => None,
            };
            match in_flight {
                Some(in_flight) => in_flight,
                None => {
                    inner.last_generation += 1;
                    let generation = inner.last_generation;
                    let attempt = self.establish(generation);
                    inner.state = ConnectionState::Connecting {
                        generation,
                        attempt: attempt.clone(),
                    };
                    (generation, attempt)
                }
            }
        };

        let outcome = attempt.await;

        let mut inner = self.inner.lock();
        let still_current = matches!(
            &inner.state,
            ConnectionState::Connecting { generation: current, .. } if *current == generation
        );
        if still_current {
            inner.state = match &outcome {
                Ok(handle) => {
                    tracing::info!(generation, "Cache backend connection established");
                    ConnectionState::Ready(handle.clone())
                }
                Err(e) => {
                    tracing::warn!(generation, error = %e, "Cache backend unavailable");
                    ConnectionState::Failed
                }
            };
        }

        outcome
    }

    /// Invalidate `handle` after the backend reported a runtime error on it.
    ///
    /// Only the handle of the current generation is dropped, so a late report
    /// about an old connection never discards a newer one.
    pub fn report_failure(&self, handle: &BackendHandle, error: &CacheError) {
        let mut inner = self.inner.lock();
        let is_current = matches!(
            &inner.state,
            ConnectionState::Ready(current) if current.generation == handle.generation
        );
        if is_current {
            tracing::warn!(
                generation = handle.generation,
                error = %error,
                "Cache backend error, dropping connection"
            );
            inner.state = ConnectionState::Unconnected;
        }
    }

    /// Current state, without triggering a connection attempt.
    pub fn status(&self) -> ConnectionStatus {
        match &self.inner.lock().state {
            ConnectionState::Unconnected => ConnectionStatus::Unconnected,
            ConnectionState::Connecting { .. } => ConnectionStatus::Connecting,
            ConnectionState::Ready(_) => ConnectionStatus::Ready,
            ConnectionState::Failed => ConnectionStatus::Failed,
        }
    }

    fn establish(&self, generation: u64) -> SharedAttempt {
        let connector = Arc::clone(&self.connector);
        let policy = self.policy.clone();
        async move { connect_with_retry(connector, policy, generation).await }
            .boxed()
            .shared()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("status", &self.status())
            .field("policy", &self.policy)
            .finish()
    }
}

async fn connect_with_retry(
    connector: Arc<dyn Connector>,
    policy: ConnectPolicy,
    generation: u64,
) -> CacheResult<BackendHandle> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match tokio::time::timeout(policy.connect_timeout, connect_once(&*connector))
            .await
        {
            Ok(Ok(store)) => return Ok(BackendHandle { store, generation }),
            Ok(Err(e)) => e,
            Err(_) => CacheError::timeout(policy.connect_timeout),
        };

        if !error.is_transient() || attempt >= max_attempts {
            return Err(error);
        }

        let delay = policy.backoff(attempt);
        tracing::debug!(
            generation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Cache backend connect failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

async fn connect_once(connector: &dyn Connector) -> CacheResult<DynStore> {
    let store = connector.connect().await?;
    store.ping().await?;
    Ok(store)
}

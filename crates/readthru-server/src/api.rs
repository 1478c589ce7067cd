//! Cached operations consumed by the HTTP handlers.
//!
//! Each operation resolves through the read-through cache under its own key
//! and falls back to the origin on a miss:
//!
//! | Operation                  | Cache key           | Origin path            |
//! |----------------------------|---------------------|------------------------|
//! | `fetch_users`              | `users`             | `/users`               |
//! | `fetch_posts`              | `posts`             | `/posts`               |
//! | `fetch_user_by_id`         | `user:<id>`         | `/users/<id>`          |
//! | `fetch_posts_by_user_id`   | `posts:user:<id>`   | `/users/<id>/posts`    |

use readthru_cache::{CachedResponse, LatencyComparison, ReadThroughCache, compare_latency};

use crate::models::{Post, User};
use crate::origin::{OriginClient, OriginError};

/// Cache key helpers.
pub mod keys {
    pub const USERS: &str = "users";
    pub const POSTS: &str = "posts";

    pub fn user(id: u64) -> String {
        format!("user:{id}")
    }

    pub fn posts_by_user(user_id: u64) -> String {
        format!("posts:user:{user_id}")
    }
}

/// Origin data served through the cache.
#[derive(Debug, Clone)]
pub struct CachedApi {
    origin: OriginClient,
    cache: ReadThroughCache,
}

impl CachedApi {
    pub fn new(origin: OriginClient, cache: ReadThroughCache) -> Self {
        Self { origin, cache }
    }

    pub fn cache(&self) -> &ReadThroughCache {
        &self.cache
    }

    pub async fn fetch_users(&self) -> Result<CachedResponse<Vec<User>>, OriginError> {
        self.cache
            .read_through(keys::USERS, || self.origin.users())
            .await
    }

    pub async fn fetch_posts(&self) -> Result<CachedResponse<Vec<Post>>, OriginError> {
        self.cache
            .read_through(keys::POSTS, || self.origin.posts())
            .await
    }

    pub async fn fetch_user_by_id(&self, id: u64) -> Result<CachedResponse<User>, OriginError> {
        self.cache
            .read_through(&keys::user(id), || self.origin.user(id))
            .await
    }

    pub async fn fetch_posts_by_user_id(
        &self,
        user_id: u64,
    ) -> Result<CachedResponse<Vec<Post>>, OriginError> {
        self.cache
            .read_through(&keys::posts_by_user(user_id), || {
                self.origin.posts_by_user(user_id)
            })
            .await
    }

    /// Time a direct `/users` fetch against the cached `fetch_users` path.
    pub async fn benchmark_performance(&self) -> Result<LatencyComparison, OriginError> {
        compare_latency(|| self.origin.users(), || self.fetch_users()).await
    }
}

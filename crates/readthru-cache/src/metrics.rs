//! Cache counters recorded through the `metrics` facade.
//!
//! Nothing is exported unless the embedding process installs a recorder.

use metrics::{counter, histogram};
use std::time::Duration;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_BACKEND_UNAVAILABLE_TOTAL: &str = "cache_backend_unavailable_total";
    pub const CACHE_READ_DURATION_SECONDS: &str = "cache_read_duration_seconds";
}

/// Where a hit was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTier {
    Backend,
    Local,
}

impl HitTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Local => "local",
        }
    }
}

pub fn record_cache_hit(tier: HitTier) {
    counter!(names::CACHE_HITS_TOTAL, "tier" => tier.as_str()).increment(1);
}

pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

pub fn record_backend_unavailable() {
    counter!(names::CACHE_BACKEND_UNAVAILABLE_TOTAL).increment(1);
}

pub fn record_read_duration(hit: bool, duration: Duration) {
    let outcome = if hit { "hit" } else { "miss" };
    histogram!(names::CACHE_READ_DURATION_SECONDS, "outcome" => outcome)
        .record(duration.as_secs_f64());
}

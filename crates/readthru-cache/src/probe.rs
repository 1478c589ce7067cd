//! Latency comparison between a direct origin call and a cache-aside call.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::Instant;

/// Result of [`compare_latency`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyComparison {
    pub origin_millis: u64,
    pub cache_millis: u64,
    /// `origin_millis - cache_millis`; negative when the cached path was slower.
    pub difference_millis: i64,
    /// Rounded to two decimals. `0.0` when the origin call measured zero.
    pub percent_faster: f64,
}

impl LatencyComparison {
    pub fn new(origin_millis: u64, cache_millis: u64) -> Self {
        let difference_millis = origin_millis as i64 - cache_millis as i64;
        let percent_faster = if origin_millis == 0 {
            0.0
        } else {
            round2(difference_millis as f64 / origin_millis as f64 * 100.0)
        };
        Self {
            origin_millis,
            cache_millis,
            difference_millis,
            percent_faster,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Time one uncached `origin` call against a warmed `cached` call.
///
/// `cached` runs twice: the first call may populate the cache, only the second
/// is measured.
///
/// # Errors
///
/// Propagates the first error from either call.
pub async fn compare_latency<O, OFut, C, CFut, A, B, E>(
    origin: O,
    mut cached: C,
) -> Result<LatencyComparison, E>
where
    O: FnOnce() -> OFut,
    OFut: Future<Output = Result<A, E>>,
    C: FnMut() -> CFut,
    CFut: Future<Output = Result<B, E>>,
{
    let started = Instant::now();
    origin().await?;
    let origin_millis = started.elapsed().as_millis() as u64;

    cached().await?;

    let started = Instant::now();
    cached().await?;
    let cache_millis = started.elapsed().as_millis() as u64;

    let comparison = LatencyComparison::new(origin_millis, cache_millis);
    tracing::debug!(
        origin_ms = comparison.origin_millis,
        cache_ms = comparison.cache_millis,
        percent_faster = comparison.percent_faster,
        "latency comparison"
    );
    Ok(comparison)
}

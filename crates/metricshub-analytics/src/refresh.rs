//! Read-through caching of computed report payloads.

use std::future::Future;

use metricshub_cache::TieredCache;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A report payload and whether it came from the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cached<T> {
    pub data: T,
    pub cached: bool,
}

/// Returns the cached value for `key`, or awaits `compute` and caches its
/// result for `ttl_secs` (policy default when `None`).
///
/// A failed computation is returned unchanged and nothing is cached.
/// Concurrent misses on the same key each run `compute`; the last write wins.
pub async fn load_or_refresh<T, E, F, Fut>(
    cache: &TieredCache,
    key: &str,
    ttl_secs: Option<u64>,
    compute: F,
) -> Result<Cached<T>, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(data) = cache.get::<T>(key).await {
        tracing::debug!(key, "Returning cached report");
        return Ok(Cached { data, cached: true });
    }

    tracing::debug!(key, "Cache miss, computing report");
    let data = compute().await?;

    if let Err(e) = cache.set(key, &data, ttl_secs).await {
        tracing::warn!(key, error = %e, "Computed report could not be cached");
    }
    Ok(Cached {
        data,
        cached: false,
    })
}

//! Tiered TTL cache for dashboard query results.
//!
//! [`TieredCache`] keeps every value in an in-process tier and, when a Redis
//! URL is configured, in a shared durable tier as well. TTLs come from a
//! per-data-source [`TtlPolicy`]. Durable failures degrade the cache to the
//! in-process tier instead of failing requests.
//!
//! ```no_run
//! # async fn demo() -> Result<(), metricshub_cache::CacheError> {
//! use metricshub_cache::{CacheKey, TieredCache, TtlPolicy, sources};
//!
//! let cache = TieredCache::local_only(TtlPolicy::builtin());
//! let key = CacheKey::new("users-metrics").version(2).param(30).param("all");
//! cache.set_for_source(&key.build(), &vec![1, 2, 3], sources::BIGQUERY_GA4).await?;
//! let hit: Option<Vec<u32>> = cache.get(&key.build()).await;
//! # Ok(())
//! # }
//! ```

pub mod durable;
pub mod error;
pub mod key;
mod latch;
mod local;
pub mod pattern;
pub mod policy;
pub mod redis_store;
pub mod stats;
pub mod telemetry;
mod tiered;

pub use durable::DurableStore;
pub use error::{CacheError, DurableError, DurableResult};
pub use key::CacheKey;
pub use latch::TierState;
pub use pattern::GlobPattern;
pub use policy::{DEFAULT_TTL_SECS, TtlPolicy, sources};
pub use redis_store::RedisStore;
pub use stats::{CacheStats, TierKind};
pub use tiered::TieredCache;

//! Durable (shared) cache tier contract.

use async_trait::async_trait;

use crate::error::DurableResult;

/// A shared key-value store used as the primary cache tier when configured.
///
/// Values are serialized JSON strings; expiry is enforced by the store.
/// Implementations report every failure as an error and never panic; the
/// tiered cache decides what an error means for the tier.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Returns `Ok(None)` on a miss.
    async fn get(&self, key: &str) -> DurableResult<Option<String>>;

    async fn set_with_expiry(&self, key: &str, ttl_secs: u64, value: &str) -> DurableResult<()>;

    /// Deletes all given keys; missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> DurableResult<()>;

    /// Keys matching a glob pattern (`*`, `?`).
    async fn keys_matching(&self, pattern: &str) -> DurableResult<Vec<String>>;

    /// Drops every key in the store's keyspace.
    async fn flush_all(&self) -> DurableResult<()>;

    /// Round-trip connectivity check.
    async fn ping(&self) -> DurableResult<()>;

    /// Releases connections. Must be idempotent.
    async fn close(&self) -> DurableResult<()>;

    /// Short backend name for logs and stats.
    fn backend_name(&self) -> &'static str;
}

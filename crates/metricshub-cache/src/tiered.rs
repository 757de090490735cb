//! Two-tier cache: optional durable store in front of the in-process tier.
//!
//! Every write lands in the local tier, and also in the durable tier while
//! it is available. Reads try the durable tier first and fall back to the
//! local tier. The first durable error downgrades the cache to local-only
//! (see [`crate::latch`]); durable errors are logged and counted but never
//! returned to callers. A re-promoted durable tier first drops every key the
//! local tier changed without it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metricshub_config::{CacheConfig, RedisConfig};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::durable::DurableStore;
use crate::error::{CacheError, DurableError, DurableResult};
use crate::latch::{Permit, Resync, Stale, TierLatch, TierState};
use crate::local::{CachedEntry, LocalStore, Lookup};
use crate::pattern::GlobPattern;
use crate::policy::TtlPolicy;
use crate::redis_store::{RedisStore, redact_url};
use crate::stats::{CacheStats, Counters, TierKind};
use crate::telemetry;

pub struct TieredCache {
    durable: Option<Arc<dyn DurableStore>>,
    latch: TierLatch,
    local: LocalStore,
    policy: TtlPolicy,
    counters: Counters,
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("durable", &self.durable.as_ref().map(|d| d.backend_name()))
            .field("tier_state", &self.latch.state())
            .field("local_entries", &self.local.len())
            .finish()
    }
}

impl TieredCache {
    /// A cache with no durable tier.
    pub fn local_only(policy: TtlPolicy) -> Self {
        Self::build(policy, None, TierState::Unconfigured, None)
    }

    /// A cache over `store`, assumed reachable until an operation fails.
    pub fn with_durable(
        policy: TtlPolicy,
        store: Arc<dyn DurableStore>,
        reprobe_after: Option<Duration>,
    ) -> Self {
        Self::build(policy, Some(store), TierState::Available, reprobe_after)
    }

    fn build(
        policy: TtlPolicy,
        durable: Option<Arc<dyn DurableStore>>,
        state: TierState,
        reprobe_after: Option<Duration>,
    ) -> Self {
        Self {
            durable,
            latch: TierLatch::new(state, reprobe_after),
            local: LocalStore::new(),
            policy,
            counters: Counters::default(),
        }
    }

    /// Builds the cache from configuration.
    ///
    /// Without a Redis URL, or when the pool cannot be built, the cache is
    /// local-only. A Redis server that does not answer the startup ping
    /// leaves the durable tier configured but already downgraded, so a
    /// re-probe interval can still bring it back.
    pub async fn connect(redis: &RedisConfig, cache: &CacheConfig) -> Self {
        let policy = TtlPolicy::from_config(cache);
        let reprobe_after = cache.reprobe_interval();

        let Some(url) = redis.url.as_deref().filter(|_| redis.is_configured()) else {
            tracing::info!("No Redis URL configured, using in-memory cache");
            return Self::local_only(policy);
        };
        let redacted = redact_url(url);

        let store: Arc<dyn DurableStore> = match RedisStore::from_config(redis) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(url = %redacted, error = %e, "Failed to create Redis pool, using in-memory cache");
                return Self::local_only(policy);
            }
        };

        match store.ping().await {
            Ok(()) => {
                tracing::info!(url = %redacted, pool_size = redis.pool_size, "Connected to Redis cache tier");
                Self::build(policy, Some(store), TierState::Available, reprobe_after)
            }
            Err(e) => {
                tracing::warn!(
                    url = %redacted,
                    error = %e,
                    reprobe_secs = reprobe_after.map(|d| d.as_secs()),
                    "Redis unreachable at startup, serving from in-memory cache"
                );
                Self::build(policy, Some(store), TierState::Downgraded, reprobe_after)
            }
        }
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    pub fn tier_state(&self) -> TierState {
        self.latch.state()
    }

    pub fn is_durable_available(&self) -> bool {
        self.latch.state() == TierState::Available
    }

    /// Runs `call` against the durable tier if the latch allows it.
    ///
    /// Returns `None` when the tier was skipped or the call failed; failures
    /// are counted and fed to the latch. `stale` names what a skipped or
    /// failed mutation leaves outdated in the durable tier.
    async fn on_durable<'a, T, F, Fut>(
        &'a self,
        op: &'static str,
        stale: Option<Stale<'_>>,
        call: F,
    ) -> Option<T>
    where
        F: FnOnce(&'a dyn DurableStore) -> Fut,
        Fut: Future<Output = DurableResult<T>>,
    {
        let store = self.durable.as_deref()?;
        let permit = self.latch.permit(stale)?;

        if permit == Permit::Probe {
            if let Err(e) = self.resync(store).await {
                self.durable_failed(op, store, stale, &e);
                return None;
            }
        }

        match call(store).await {
            Ok(value) => {
                self.latch.record_success(permit);
                Some(value)
            }
            Err(e) => {
                self.durable_failed(op, store, stale, &e);
                None
            }
        }
    }

    fn durable_failed(
        &self,
        op: &'static str,
        store: &dyn DurableStore,
        stale: Option<Stale<'_>>,
        error: &DurableError,
    ) {
        Counters::bump(&self.counters.durable_errors);
        telemetry::record_durable_error(op);
        if self.latch.record_failure(stale) {
            tracing::warn!(
                op,
                backend = store.backend_name(),
                error = %error,
                "Durable cache tier failed, falling back to in-memory cache"
            );
        } else {
            tracing::debug!(op, error = %error, "Durable cache operation failed");
        }
    }

    /// Replays the mutations journaled while downgraded as durable deletions.
    /// Reads then fall through to the local tier for those keys.
    async fn resync(&self, store: &dyn DurableStore) -> DurableResult<()> {
        let pending = self.latch.take_resync();
        if pending.is_empty() {
            return Ok(());
        }
        match replay(store, &pending).await {
            Ok(()) => {
                tracing::info!(
                    keys = pending.keys.len(),
                    patterns = pending.patterns.len(),
                    flush = pending.flush,
                    "Resynchronized durable cache tier"
                );
                Ok(())
            }
            Err(e) => {
                self.latch.restore_resync(pending);
                Err(e)
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(Some(raw)) = self.on_durable("get", None, |store| store.get(key)).await {
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    Counters::bump(&self.counters.hits);
                    telemetry::record_hit(telemetry::TIER_DURABLE);
                    return Some(value);
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Ignoring undecodable durable cache payload");
                }
            }
        }

        match self.local.get(key) {
            Lookup::Hit(payload) => match serde_json::from_str(&payload) {
                Ok(value) => {
                    Counters::bump(&self.counters.hits);
                    telemetry::record_hit(telemetry::TIER_LOCAL);
                    Some(value)
                }
                Err(e) => {
                    tracing::debug!(key, error = %e, "Cached value does not match requested type");
                    self.record_miss()
                }
            },
            Lookup::Expired => {
                Counters::bump(&self.counters.expired);
                telemetry::set_local_entries(self.local.len());
                self.record_miss()
            }
            Lookup::Missing => self.record_miss(),
        }
    }

    fn record_miss<T>(&self) -> Option<T> {
        Counters::bump(&self.counters.misses);
        telemetry::record_miss();
        None
    }

    /// Stores `value` under `key`. A missing or zero `ttl_secs` uses the
    /// policy default.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> Result<(), CacheError> {
        let ttl = self.policy.resolve(ttl_secs);
        let payload: Arc<str> = Arc::from(serde_json::to_string(value)?);

        self.on_durable("set", Some(Stale::Key(key)), |store| store.set_with_expiry(key, ttl, &payload))
            .await;

        self.local
            .insert(key, CachedEntry::new(payload, Duration::from_secs(ttl)));
        telemetry::set_local_entries(self.local.len());
        Ok(())
    }

    /// [`Self::set`] with the TTL configured for `source`.
    pub async fn set_for_source<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        source: &str,
    ) -> Result<(), CacheError> {
        let ttl = self.policy.ttl_for(source);
        self.set(key, value, Some(ttl)).await
    }

    pub async fn delete(&self, key: &str) {
        let keys = [key.to_string()];
        self.on_durable("delete", Some(Stale::Key(key)), |store| store.delete(&keys)).await;

        if self.local.remove(key) {
            telemetry::set_local_entries(self.local.len());
        }
        telemetry::record_invalidation("key");
    }

    /// Removes every key matching the glob `pattern` from both tiers and
    /// returns how many local entries were removed.
    pub async fn clear_pattern(&self, pattern: &str) -> usize {
        let durable_removed = self
            .on_durable("clear_pattern", Some(Stale::Pattern(pattern)), |store| async move {
                let keys = store.keys_matching(pattern).await?;
                store.delete(&keys).await?;
                Ok::<_, DurableError>(keys.len())
            })
            .await;

        let removed = self.local.remove_matching(&GlobPattern::new(pattern));
        telemetry::set_local_entries(self.local.len());
        telemetry::record_invalidation("pattern");

        tracing::debug!(
            pattern,
            local_removed = removed,
            durable_removed = ?durable_removed,
            "Cleared cache pattern"
        );
        removed
    }

    pub async fn clear_all(&self) {
        self.on_durable("clear_all", Some(Stale::All), |store| store.flush_all()).await;

        self.local.clear();
        telemetry::set_local_entries(0);
        telemetry::record_invalidation("all");
        tracing::info!("Cleared all cache entries");
    }

    pub fn stats(&self) -> CacheStats {
        let tier_state = self.latch.state();
        CacheStats {
            primary: if tier_state == TierState::Available {
                TierKind::Durable
            } else {
                TierKind::Local
            },
            durable_backend: self.durable.as_ref().map(|d| d.backend_name()),
            tier_state,
            local_entries: self.local.len(),
            local_bytes: self.local.approx_bytes(),
            hits: Counters::read(&self.counters.hits),
            misses: Counters::read(&self.counters.misses),
            expired: Counters::read(&self.counters.expired),
            durable_errors: Counters::read(&self.counters.durable_errors),
        }
    }

    /// Releases the durable tier. Later calls are no-ops and the cache keeps
    /// serving from the local tier.
    pub async fn close(&self) {
        if !self.latch.close() {
            return;
        }
        if let Some(store) = &self.durable {
            match store.close().await {
                Ok(()) => tracing::info!(backend = store.backend_name(), "Durable cache tier closed"),
                Err(e) => tracing::warn!(error = %e, "Error closing durable cache tier"),
            }
        }
    }
}

async fn replay(store: &dyn DurableStore, pending: &Resync) -> DurableResult<()> {
    if pending.flush {
        return store.flush_all().await;
    }
    let keys: Vec<String> = pending.keys.iter().cloned().collect();
    store.delete(&keys).await?;
    for pattern in &pending.patterns {
        let matched = store.keys_matching(pattern).await?;
        store.delete(&matched).await?;
    }
    Ok(())
}

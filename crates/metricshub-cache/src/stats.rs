//! Cache statistics snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::latch::TierState;

/// Which tier currently serves reads first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Durable,
    Local,
}

/// Point-in-time view of the cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// `durable` while the durable tier is configured and available.
    pub primary: TierKind,
    /// Backend name of the durable tier, if one is configured.
    pub durable_backend: Option<&'static str>,
    pub tier_state: TierState,
    /// Entries in the local tier, expired-but-unpurged ones included.
    pub local_entries: usize,
    /// Approximate local footprint (keys plus serialized payloads).
    pub local_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    /// Local entries found stale and purged by a lookup.
    pub expired: u64,
    /// Durable operations that failed.
    pub durable_errors: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub expired: AtomicU64,
    pub durable_errors: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

//! In-process cache tier.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::pattern::GlobPattern;

/// Bytes charged per entry for the timestamp and TTL when estimating size.
const ENTRY_OVERHEAD_BYTES: usize = 16;

/// A cached entry with TTL support.
///
/// The serialized payload is wrapped in `Arc` so hits and durable writes
/// share it without copying.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub payload: Arc<str>,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(payload: Arc<str>, ttl: Duration) -> Self {
        Self {
            payload,
            stored_at: Instant::now(),
            ttl,
        }
    }

    /// Valid while strictly younger than its TTL.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

#[derive(Debug)]
pub(crate) enum Lookup {
    Hit(Arc<str>),
    /// Present but past its TTL; the entry has been removed.
    Expired,
    Missing,
}

/// Sharded map of key to entry. Expiry is lazy: entries are only dropped by
/// the lookup that finds them stale, or by explicit invalidation.
#[derive(Debug, Default)]
pub(crate) struct LocalStore {
    entries: DashMap<String, CachedEntry>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Lookup {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_valid_at(now) => return Lookup::Hit(Arc::clone(&entry.payload)),
            Some(_) => {}
            None => return Lookup::Missing,
        }

        // Re-checked under the shard lock so a concurrent fresh write survives.
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_valid_at(now))
            .is_some()
        {
            return Lookup::Expired;
        }
        match self.entries.get(key) {
            Some(entry) if entry.is_valid_at(now) => Lookup::Hit(Arc::clone(&entry.payload)),
            _ => Lookup::Missing,
        }
    }

    pub fn insert(&self, key: &str, entry: CachedEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes every key matching `pattern`, returning how many went.
    pub fn remove_matching(&self, pattern: &GlobPattern) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            if pattern.matches(key) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Approximate footprint of keys and serialized payloads.
    pub fn approx_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.key().len() + e.value().payload.len() + ENTRY_OVERHEAD_BYTES)
            .sum()
    }
}

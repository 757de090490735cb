//! In-memory `DurableStore` double with switchable failures.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use metricshub_cache::{DurableError, DurableResult, DurableStore, GlobPattern};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, u64)>>,
    calls: AtomicUsize,
    close_calls: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later call fails with a connection error until healed.
    pub fn break_connection(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    /// Number of trait calls received, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).map(|(v, _)| v.clone())
    }

    pub fn ttl(&self, key: &str) -> Option<u64> {
        self.entries.lock().get(key).map(|(_, ttl)| *ttl)
    }

    /// Writes behind the cache's back.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), 300));
    }

    pub fn remove_raw(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn enter(&self) -> DurableResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(DurableError::Connection("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> DurableResult<Option<String>> {
        self.enter()?;
        Ok(self.raw(key))
    }

    async fn set_with_expiry(&self, key: &str, ttl_secs: u64, value: &str) -> DurableResult<()> {
        self.enter()?;
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), ttl_secs));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> DurableResult<()> {
        self.enter()?;
        let mut entries = self.entries.lock();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn keys_matching(&self, pattern: &str) -> DurableResult<Vec<String>> {
        self.enter()?;
        let glob = GlobPattern::new(pattern);
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| glob.matches(k))
            .cloned()
            .collect())
    }

    async fn flush_all(&self) -> DurableResult<()> {
        self.enter()?;
        self.entries.lock().clear();
        Ok(())
    }

    async fn ping(&self) -> DurableResult<()> {
        self.enter()
    }

    async fn close(&self) -> DurableResult<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

//! Cache metrics emitted through the `metrics` facade.
//!
//! Nothing is recorded unless the host process installs a recorder.

use metrics::{counter, gauge};

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_ENTRIES: &str = "cache_entries";
    pub const CACHE_DURABLE_ERRORS_TOTAL: &str = "cache_durable_errors_total";
    pub const CACHE_INVALIDATIONS_TOTAL: &str = "cache_invalidations_total";
}

pub(crate) const TIER_DURABLE: &str = "durable";
pub(crate) const TIER_LOCAL: &str = "local";

pub(crate) fn record_hit(tier: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "tier" => tier).increment(1);
}

pub(crate) fn record_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

pub(crate) fn record_durable_error(op: &'static str) {
    counter!(names::CACHE_DURABLE_ERRORS_TOTAL, "op" => op).increment(1);
}

pub(crate) fn record_invalidation(kind: &'static str) {
    counter!(names::CACHE_INVALIDATIONS_TOTAL, "kind" => kind).increment(1);
}

pub(crate) fn set_local_entries(count: usize) {
    gauge!(names::CACHE_ENTRIES, "tier" => TIER_LOCAL).set(count as f64);
}

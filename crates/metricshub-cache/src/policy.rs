//! Per-source TTL policy table.

use std::collections::HashMap;

use metricshub_config::CacheConfig;

/// Data-source identifiers with a built-in TTL.
pub mod sources {
    /// GA4 export tables; the data itself lags by a day or more.
    pub const BIGQUERY_GA4: &str = "bigquery-ga4";
    /// Real-time CRM API.
    pub const SALESFORCE: &str = "salesforce";
    pub const SKIPTRACE: &str = "skiptrace";
    /// Job status, near real-time.
    pub const AWS_PIPELINES: &str = "aws-pipelines";
    pub const QA_AXIOMS: &str = "qa-axioms";
    pub const ML_MODELS: &str = "ml-models";
}

pub const DEFAULT_TTL_SECS: u64 = 300;

const BUILTIN_TTLS: &[(&str, u64)] = &[
    (sources::BIGQUERY_GA4, 300),
    (sources::SALESFORCE, 60),
    (sources::SKIPTRACE, 300),
    (sources::AWS_PIPELINES, 60),
    (sources::QA_AXIOMS, 120),
    (sources::ML_MODELS, 300),
];

/// Immutable mapping from data-source identifier to TTL seconds, plus the
/// fallback applied to unknown sources and to writes without a TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    default_secs: u64,
    by_source: HashMap<String, u64>,
}

impl TtlPolicy {
    /// The built-in table with the 5 minute default.
    pub fn builtin() -> Self {
        Self {
            default_secs: DEFAULT_TTL_SECS,
            by_source: BUILTIN_TTLS
                .iter()
                .map(|(source, ttl)| ((*source).to_string(), *ttl))
                .collect(),
        }
    }

    /// Built-in table with configured overrides and additions merged on top.
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut policy = Self::builtin().with_default(config.default_ttl_secs);
        for (source, ttl) in &config.source_ttls {
            policy = policy.with_source(source.clone(), *ttl);
        }
        policy
    }

    /// A zero default is ignored.
    pub fn with_default(mut self, secs: u64) -> Self {
        if secs > 0 {
            self.default_secs = secs;
        }
        self
    }

    /// A zero TTL is ignored.
    pub fn with_source(mut self, source: impl Into<String>, secs: u64) -> Self {
        if secs > 0 {
            self.by_source.insert(source.into(), secs);
        }
        self
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.default_secs
    }

    /// TTL for `source`, falling back to the default for unknown sources.
    pub fn ttl_for(&self, source: &str) -> u64 {
        self.by_source
            .get(source)
            .copied()
            .unwrap_or(self.default_secs)
    }

    /// Effective TTL for a write: the requested value when present and
    /// non-zero, the default otherwise.
    pub fn resolve(&self, requested: Option<u64>) -> u64 {
        requested.filter(|ttl| *ttl > 0).unwrap_or(self.default_secs)
    }

    /// Known sources in name order.
    pub fn sources(&self) -> Vec<(&str, u64)> {
        let mut all: Vec<_> = self
            .by_source
            .iter()
            .map(|(source, ttl)| (source.as_str(), *ttl))
            .collect();
        all.sort_unstable_by(|a, b| a.0.cmp(b.0));
        all
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}

//! Cache key conventions.
//!
//! Keys look like `{endpoint}-v{version}:{param}:{param}`, for example
//! `users-metrics-v2:30:all`. Bump the version whenever the cached payload
//! changes shape so new code never reads an old-shaped value.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    endpoint: String,
    version: Option<u32>,
    params: Vec<String>,
}

impl CacheKey {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            version: None,
            params: Vec::new(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn param(mut self, value: impl fmt::Display) -> Self {
        self.params.push(value.to_string());
        self
    }

    /// Appends `value` when present, `all` otherwise, keeping the positional
    /// layout stable for optional filters.
    pub fn opt_param<T: fmt::Display>(self, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(v),
            None => self.param("all"),
        }
    }

    fn base(&self) -> String {
        match self.version {
            Some(v) => format!("{}-v{}", self.endpoint, v),
            None => self.endpoint.clone(),
        }
    }

    /// Glob matching every key of this endpoint and version, whatever the
    /// parameters. Keys built without parameters are not included.
    pub fn family_pattern(&self) -> String {
        format!("{}:*", self.base())
    }

    pub fn build(&self) -> String {
        let mut key = self.base();
        for p in &self.params {
            key.push(':');
            key.push_str(p);
        }
        key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.build()
    }
}

//! Configuration for the Metrics Hub services.
//!
//! All sections carry serde defaults so an empty file (or no file at all)
//! yields a runnable local-only configuration:
//!
//! ```toml
//! [server]
//! port = 4001
//!
//! [redis]
//! url = "redis://localhost:6379"
//!
//! [cache]
//! default_ttl_secs = 300
//! reprobe_interval_secs = 60
//!
//! [cache.source_ttls]
//! salesforce = 30
//! ```
//!
//! See [`loader::load_config`] for the source precedence.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod loader;

pub use loader::load_config;

/// Error types for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Durable cache tier. Leaving `url` unset keeps the cache in-process.
    #[serde(default)]
    pub redis: RedisConfig,
    /// TTL policy table and tier behavior
    #[serde(default)]
    pub cache: CacheConfig,
    /// Warehouse fan-out limits
    #[serde(default)]
    pub queries: QueryConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ConfigError::validation("server.port must be > 0"));
        }

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::validation(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }

        if let Some(url) = self.redis.url.as_deref().filter(|u| !u.trim().is_empty()) {
            let schemes = ["redis://", "rediss://", "unix://", "redis+unix://"];
            if !schemes.iter().any(|s| url.starts_with(s)) {
                return Err(ConfigError::validation(
                    "redis.url must use a redis://, rediss:// or unix:// scheme",
                ));
            }
        }
        if self.redis.pool_size == 0 {
            return Err(ConfigError::validation("redis.pool_size must be > 0"));
        }

        if self.cache.default_ttl_secs == 0 {
            return Err(ConfigError::validation("cache.default_ttl_secs must be > 0"));
        }
        if let Some((source, _)) = self.cache.source_ttls.iter().find(|(_, ttl)| **ttl == 0) {
            return Err(ConfigError::validation(format!(
                "cache.source_ttls.{source} must be > 0"
            )));
        }
        if self.cache.reprobe_interval_secs == Some(0) {
            return Err(ConfigError::validation(
                "cache.reprobe_interval_secs must be > 0 when set",
            ));
        }

        if self.queries.max_concurrency == 0 {
            return Err(ConfigError::validation("queries.max_concurrency must be > 0"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    4001
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Redis configuration for the durable cache tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379").
    /// Absent means the durable tier is never engaged.
    #[serde(default)]
    pub url: Option<String>,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl RedisConfig {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL applied when a caller supplies none
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Per-source TTL overrides, merged over the built-in table
    #[serde(default)]
    pub source_ttls: HashMap<String, u64>,

    /// Seconds after a durable-tier failure before one trial operation is
    /// allowed. Unset keeps the tier disabled for the life of the process.
    #[serde(default)]
    pub reprobe_interval_secs: Option<u64>,
}

fn default_ttl_secs() -> u64 {
    300 // 5 minutes
}

impl CacheConfig {
    pub fn reprobe_interval(&self) -> Option<Duration> {
        self.reprobe_interval_secs.map(Duration::from_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            source_ttls: HashMap::new(),
            reprobe_interval_secs: None,
        }
    }
}

/// Limits applied to warehouse query fan-out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Upper bound on concurrently running queries within one join
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Deadline for a whole join, in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_max_concurrency() -> usize {
    8
}

impl QueryConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            timeout_ms: None,
        }
    }
}

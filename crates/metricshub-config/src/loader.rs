//! Layered configuration loading.
//!
//! Precedence, lowest first:
//! 1. serde defaults
//! 2. the TOML file (`metricshub.toml` unless a path is given)
//! 3. `METRICSHUB__SECTION__KEY` environment variables
//! 4. a bare `REDIS_URL`, only when `redis.url` is still unset

use std::path::PathBuf;

use config::{Config, Environment, File};

use crate::{AppConfig, ConfigError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "metricshub.toml";
pub const ENV_PREFIX: &str = "METRICSHUB";

pub fn load_config(path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();
    let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
    if pathbuf.exists() {
        builder = builder.add_source(File::from(pathbuf));
    } else if path.is_some() {
        tracing::warn!(path = %pathbuf.display(), "config file not found, using defaults");
    }
    // Environment variable overrides, e.g., METRICSHUB__SERVER__PORT=9090
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .separator("__"),
    );
    let cfg = builder
        .build()
        .map_err(|e| ConfigError::parse(format!("config build error: {e}")))?;
    let mut merged: AppConfig = cfg
        .try_deserialize()
        .map_err(|e| ConfigError::parse(format!("config deserialize error: {e}")))?;

    merged.redis.url = merged
        .redis
        .url
        .take()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| std::env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty()));

    merged.validate()?;
    Ok(merged)
}

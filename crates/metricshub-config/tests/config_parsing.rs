use std::{env, fs};

use metricshub_config::{ConfigError, load_config};

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("metricshub.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 4101

[logging]
level = "debug"

[redis]
url = "redis://cache.internal:6379"
pool_size = 4

[cache]
default_ttl_secs = 240
reprobe_interval_secs = 30

[cache.source_ttls]
salesforce = 45
warehouse-hourly = 3600

[queries]
max_concurrency = 3
timeout_ms = 20000
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 4101);
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.redis.url.as_deref(), Some("redis://cache.internal:6379"));
    assert_eq!(cfg.redis.pool_size, 4);
    assert_eq!(cfg.cache.default_ttl_secs, 240);
    assert_eq!(cfg.cache.source_ttls.get("salesforce"), Some(&45));
    assert_eq!(cfg.cache.source_ttls.get("warehouse-hourly"), Some(&3600));
    assert_eq!(cfg.cache.reprobe_interval_secs, Some(30));
    assert_eq!(cfg.queries.max_concurrency, 3);
    assert_eq!(cfg.queries.timeout_ms, Some(20_000));

    // 2) Env override should win over file
    unsafe {
        env::set_var("METRICSHUB__CACHE__DEFAULT_TTL_SECS", "90");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.cache.default_ttl_secs, 90);
    unsafe {
        env::remove_var("METRICSHUB__CACHE__DEFAULT_TTL_SECS");
    }

    // 3) Invalid config (zero TTL) should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[cache]
default_ttl_secs = 0
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("default_ttl_secs"));

    // 4) Unparseable values surface as parse errors
    let broken_path = dir.path().join("broken.toml");
    fs::write(&broken_path, "[server]\nport = \"not-a-port\"\n").expect("write broken toml");
    let err = load_config(broken_path.to_str()).expect_err("expected parse error");
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");

    let cfg = load_config(path.to_str()).expect("defaults should load");
    assert!(cfg.cache.source_ttls.is_empty());
    assert_eq!(cfg.queries.max_concurrency, 8);
}

//! Integration tests for the Redis durable tier.
//!
//! These start a Redis container through testcontainers and need a Docker
//! daemon, so they are ignored by default:
//! `cargo test -p metricshub-cache --test redis_store -- --ignored`.

use std::time::Duration;

use metricshub_cache::{DurableStore, RedisStore, TierKind, TierState, TieredCache};
use metricshub_config::{CacheConfig, RedisConfig};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn redis_config() -> RedisConfig {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");
            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            (container, format!("redis://127.0.0.1:{host_port}"))
        })
        .await;

    RedisConfig {
        url: Some(url.clone()),
        pool_size: 4,
        timeout_ms: 5000,
    }
}

#[tokio::test]
async fn unreachable_redis_starts_downgraded() {
    let redis = RedisConfig {
        url: Some("redis://127.0.0.1:1".into()),
        pool_size: 1,
        timeout_ms: 500,
    };
    let cache = TieredCache::connect(&redis, &CacheConfig::default()).await;

    assert_eq!(cache.tier_state(), TierState::Downgraded);
    cache.set("k", &1, None).await.unwrap();
    assert_eq!(cache.get::<i32>("k").await, Some(1));
    assert_eq!(cache.stats().primary, TierKind::Local);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn store_round_trip_and_scan() {
    let store = RedisStore::from_config(&redis_config().await).unwrap();
    store.ping().await.unwrap();

    store.set_with_expiry("scan-test:1", 60, "\"one\"").await.unwrap();
    store.set_with_expiry("scan-test:2", 60, "\"two\"").await.unwrap();
    store.set_with_expiry("other:1", 60, "\"x\"").await.unwrap();

    assert_eq!(store.get("scan-test:1").await.unwrap().as_deref(), Some("\"one\""));
    assert_eq!(store.get("scan-test:missing").await.unwrap(), None);

    let keys = store.keys_matching("scan-test:*").await.unwrap();
    assert_eq!(keys, vec!["scan-test:1".to_string(), "scan-test:2".to_string()]);

    store.delete(&keys).await.unwrap();
    assert!(store.keys_matching("scan-test:*").await.unwrap().is_empty());
    assert!(store.get("other:1").await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn expiry_is_enforced_by_redis() {
    let store = RedisStore::from_config(&redis_config().await).unwrap();
    store.set_with_expiry("expiring", 1, "1").await.unwrap();
    assert!(store.get("expiring").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(store.get("expiring").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn instances_share_the_durable_tier() {
    let redis = redis_config().await;
    let first = TieredCache::connect(&redis, &CacheConfig::default()).await;
    let second = TieredCache::connect(&redis, &CacheConfig::default()).await;
    assert!(first.is_durable_available());

    first.set("shared:key", &vec![1, 2, 3], None).await.unwrap();
    assert_eq!(second.get::<Vec<i32>>("shared:key").await, Some(vec![1, 2, 3]));

    assert_eq!(second.clear_pattern("shared:*").await, 0);
    assert_eq!(second.get::<Vec<i32>>("shared:key").await, None);

    first.close().await;
    second.close().await;
}

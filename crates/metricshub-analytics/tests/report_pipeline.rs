//! A users-overview report assembled the way a dashboard endpoint does it:
//! parameters to cache key, concurrent current/previous queries, trends,
//! read-through caching.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use metricshub_analytics::{
    Cached, Dataset, Polarity, QueryError, QueryResult, QuerySource, QuerySourceExt, ReportParams, Row,
    TrendSet, first_or_default, join_all, load_or_refresh, trend,
};
use metricshub_cache::{TieredCache, TtlPolicy, sources};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Default)]
struct FakeWarehouse {
    calls: AtomicUsize,
    failing: bool,
}

#[async_trait]
impl QuerySource for FakeWarehouse {
    async fn run(&self, dataset: Dataset, query: &str) -> QueryResult<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(QueryError::upstream(dataset, "quota exceeded"));
        }
        let row = if dataset == Dataset::Product {
            json!({"active_clients": 12, "plan": "enterprise"})
        } else if query.contains("previous") {
            json!({"prev_total_users": 100, "prev_bounce_rate": 0.40, "prev_sessions": 0})
        } else {
            json!({"total_users": 150, "bounce_rate": 0.30, "sessions": 900})
        };
        Ok(vec![row.as_object().cloned().unwrap_or_default()])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UsersOverview {
    total_users: f64,
    trends: TrendSet,
}

const FIELDS: &[(&str, Polarity)] = &[
    ("total_users", Polarity::HigherIsBetter),
    ("bounce_rate", Polarity::LowerIsBetter),
    ("sessions", Polarity::HigherIsBetter),
];

async fn users_overview(warehouse: &FakeWarehouse, params: &ReportParams) -> QueryResult<UsersOverview> {
    let current_sql = format!("SELECT current window of {} days", params.days);
    let previous_sql = format!("SELECT previous window of {} days", params.days);
    let mut rows = join_all(vec![
        warehouse.run_query::<Row>(&current_sql),
        warehouse.run_query::<Row>(&previous_sql),
    ])
    .await?;

    let previous = first_or_default(rows.pop().unwrap_or_default());
    let current = first_or_default(rows.pop().unwrap_or_default());
    Ok(UsersOverview {
        total_users: current.get("total_users").and_then(|v| v.as_f64()).unwrap_or_default(),
        trends: TrendSet::from_rows(&current, &previous, FIELDS),
    })
}

#[tokio::test]
async fn miss_computes_then_hit_serves_from_cache() {
    let cache = TieredCache::local_only(TtlPolicy::builtin());
    let warehouse = FakeWarehouse::default();
    let params = ReportParams::from_pairs([("days", "7")]).unwrap();
    let key = params.cache_key("users-metrics", 2).build();
    let ttl = Some(cache.policy().ttl_for(sources::BIGQUERY_GA4));

    let first: Cached<UsersOverview> =
        load_or_refresh(&cache, &key, ttl, || users_overview(&warehouse, &params))
            .await
            .unwrap();
    assert!(!first.cached);
    assert_eq!(warehouse.calls.load(Ordering::SeqCst), 2);

    let trends = &first.data.trends;
    assert!((trends.get("total_users").unwrap().value - 50.0).abs() < 1e-9);
    assert!(trends.get("bounce_rate").unwrap().is_positive);
    assert_eq!(*trends.get("sessions").unwrap(), trend(900.0, 0.0, false));

    let second = load_or_refresh(&cache, &key, ttl, || users_overview(&warehouse, &params))
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.data, first.data);
    assert_eq!(warehouse.calls.load(Ordering::SeqCst), 2, "no queries on a hit");
}

#[tokio::test]
async fn failed_fanout_propagates_and_caches_nothing() {
    let cache = TieredCache::local_only(TtlPolicy::builtin());
    let warehouse = FakeWarehouse {
        failing: true,
        ..FakeWarehouse::default()
    };
    let params = ReportParams::default();
    let key = params.cache_key("users-metrics", 2).build();

    let err = load_or_refresh(&cache, &key, None, || users_overview(&warehouse, &params))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "analytics query failed: quota exceeded");
    assert_eq!(cache.stats().local_entries, 0);
    assert!(cache.get::<UsersOverview>(&key).await.is_none());
}

#[tokio::test]
async fn cached_payload_keeps_camel_case_trends() {
    let cache = Arc::new(TieredCache::local_only(TtlPolicy::builtin()));
    let warehouse = FakeWarehouse::default();
    let params = ReportParams::default();
    let key = params.cache_key("users-metrics", 2).build();

    load_or_refresh(&cache, &key, None, || users_overview(&warehouse, &params))
        .await
        .unwrap();

    let raw: serde_json::Value = cache.get(&key).await.unwrap();
    assert_eq!(raw["trends"]["total_users"]["isPositive"], true);
    assert_eq!(raw["trends"]["bounce_rate"]["isPositive"], true);
}

#[derive(Debug, Deserialize)]
struct ClientCounts {
    active_clients: u32,
}

#[tokio::test]
async fn heterogeneous_queries_join_with_try_join() {
    let warehouse = FakeWarehouse::default();
    let (engagement, clients) = tokio::try_join!(
        warehouse.run_query::<Row>("SELECT current window"),
        warehouse.run_product_query::<ClientCounts>("SELECT active clients"),
    )
    .unwrap();

    assert_eq!(first_or_default(engagement)["sessions"], 900);
    assert_eq!(clients[0].active_clients, 12);
    assert_eq!(warehouse.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn heterogeneous_join_fails_as_a_whole() {
    let warehouse = FakeWarehouse {
        failing: true,
        ..FakeWarehouse::default()
    };
    let result = tokio::try_join!(
        warehouse.run_query::<Row>("SELECT current window"),
        warehouse.run_product_query::<ClientCounts>("SELECT active clients"),
    );
    assert!(result.is_err());
}

#[test]
fn inversion_is_symmetric_for_any_nonzero_change() {
    let samples = [-250.0, -3.5, 0.25, 1.0, 42.0, 1e6];
    for &previous in &samples {
        for &current in &samples {
            let normal = trend(current, previous, false);
            let inverted = trend(current, previous, true);
            assert_eq!(normal.value, inverted.value);
            assert!(normal.value >= 0.0);
            if current != previous {
                assert_ne!(normal.is_positive, inverted.is_positive, "{current} vs {previous}");
            }
        }
    }
}

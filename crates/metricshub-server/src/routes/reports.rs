//! Dashboard report endpoints.
//!
//! Each report follows the same pipeline: parameters to cache key, cache
//! lookup, and on a miss a concurrent current/previous-period fan-out whose
//! rows are paired into trends before the result is cached.

use std::sync::Arc;

use axum::extract::{Query, State};
use metricshub_analytics::{
    Polarity, QueryResult, QuerySource, QuerySourceExt, ReportParams, Row, TrendSet, UserType,
    first_or_default, join_bounded, load_or_refresh, with_optional_deadline,
};
use metricshub_cache::sources;
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

pub const ENGAGEMENT_ENDPOINT: &str = "engagement-metrics";
pub const ENGAGEMENT_VERSION: u32 = 1;

const ENGAGEMENT_FIELDS: &[(&str, Polarity)] = &[
    ("total_sessions", Polarity::HigherIsBetter),
    ("engaged_sessions", Polarity::HigherIsBetter),
    ("avg_engagement_time_sec", Polarity::HigherIsBetter),
    ("unique_users", Polarity::HigherIsBetter),
    ("engaged_rate", Polarity::HigherIsBetter),
    ("bounce_rate", Polarity::LowerIsBetter),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementReport {
    #[serde(flatten)]
    pub totals: Row,
    pub trends: TrendSet,
}

pub async fn engagement(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
) -> ApiResult<ApiResponse<EngagementReport>> {
    let params = ReportParams::from_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    let warehouse = state
        .warehouse
        .clone()
        .ok_or_else(|| ApiError::Unavailable("warehouse is not configured".into()))?;

    let key = params.cache_key(ENGAGEMENT_ENDPOINT, ENGAGEMENT_VERSION).build();
    let ttl = state.cache.policy().ttl_for(sources::BIGQUERY_GA4);

    let report = load_or_refresh(&state.cache, &key, Some(ttl), || {
        build_engagement(warehouse, &params, &state)
    })
    .await
    .map_err(|e| ApiError::upstream("engagement metrics", e))?;

    tracing::debug!(key = %key, cached = report.cached, "Engagement report served");
    Ok(report.into())
}

async fn build_engagement(
    warehouse: Arc<dyn QuerySource>,
    params: &ReportParams,
    state: &AppState,
) -> QueryResult<EngagementReport> {
    let current_sql = engagement_sql(params, Window::Current);
    let previous_sql = engagement_sql(params, Window::Previous);

    let join = join_bounded(
        state.queries.max_concurrency,
        [
            warehouse.run_query::<Row>(&current_sql),
            warehouse.run_query::<Row>(&previous_sql),
        ],
    );
    let mut rows = with_optional_deadline(state.queries.timeout(), join).await?;

    let previous = first_or_default(rows.pop().unwrap_or_default());
    let current = first_or_default(rows.pop().unwrap_or_default());
    Ok(EngagementReport {
        trends: TrendSet::from_rows(&current, &previous, ENGAGEMENT_FIELDS),
        totals: current,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    /// The last `days` days.
    Current,
    /// The `days` days before that; columns carry the `prev_` prefix.
    Previous,
}

/// `params.property` must already be a plain identifier, as `ReportParams::from_pairs` guarantees.
fn engagement_sql(params: &ReportParams, window: Window) -> String {
    let days = params.days;
    let (prefix, from_days, to_days) = match window {
        Window::Current => ("", days, 1),
        Window::Previous => ("prev_", days * 2, days + 1),
    };
    let user_filter = match params.user_type {
        UserType::All => String::new(),
        other => format!(
            "\n  AND (SELECT value.string_value FROM UNNEST(user_properties) WHERE key = 'user_type') = '{other}'"
        ),
    };

    format!(
        "WITH sessions AS (
  SELECT
    user_pseudo_id,
    (SELECT value.int_value FROM UNNEST(event_params) WHERE key = 'ga_session_id') AS session_id,
    MAX((SELECT value.string_value FROM UNNEST(event_params) WHERE key = 'session_engaged')) = '1' AS engaged,
    SUM((SELECT value.int_value FROM UNNEST(event_params) WHERE key = 'engagement_time_msec')) / 1000 AS engagement_sec
  FROM `analytics_{property}.events_*`
  WHERE _TABLE_SUFFIX BETWEEN FORMAT_DATE('%Y%m%d', DATE_SUB(CURRENT_DATE(), INTERVAL {from_days} DAY))
    AND FORMAT_DATE('%Y%m%d', DATE_SUB(CURRENT_DATE(), INTERVAL {to_days} DAY)){user_filter}
  GROUP BY user_pseudo_id, session_id
)
SELECT
  COUNT(*) AS {prefix}total_sessions,
  COUNTIF(engaged) AS {prefix}engaged_sessions,
  ROUND(AVG(engagement_sec), 1) AS {prefix}avg_engagement_time_sec,
  COUNT(DISTINCT user_pseudo_id) AS {prefix}unique_users,
  ROUND(SAFE_DIVIDE(COUNTIF(engaged), COUNT(*)) * 100, 2) AS {prefix}engaged_rate,
  ROUND(SAFE_DIVIDE(COUNTIF(NOT engaged), COUNT(*)) * 100, 2) AS {prefix}bounce_rate
FROM sessions",
        property = params.property,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_window_is_prefixed_and_shifted() {
        let params = ReportParams::from_pairs([("days", "7"), ("userType", "internal")]).unwrap();
        let current = engagement_sql(&params, Window::Current);
        let previous = engagement_sql(&params, Window::Previous);

        assert!(current.contains("AS total_sessions"));
        assert!(current.contains("INTERVAL 7 DAY"));
        assert!(previous.contains("AS prev_total_sessions"));
        assert!(previous.contains("INTERVAL 14 DAY"));
        assert!(previous.contains("INTERVAL 8 DAY"));
        assert!(current.contains("= 'internal'"));
        assert!(current.contains("`analytics_8020rei.events_*`"));
    }

    #[test]
    fn all_users_has_no_filter() {
        let sql = engagement_sql(&ReportParams::default(), Window::Current);
        assert!(!sql.contains("user_properties"));
    }
}

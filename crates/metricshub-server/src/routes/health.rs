use std::time::Instant;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use metricshub_analytics::with_optional_deadline;
use metricshub_cache::{CacheStats, TierState};
use serde::Serialize;
use serde_json::json;

use super::{ApiResponse, now_rfc3339};
use crate::error::{ApiError, ApiResult};
use crate::metrics::render_metrics;
use crate::server::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Connected,
    Disconnected,
    NotConfigured,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub name: &'static str,
    pub status: ServiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since the server started.
    pub uptime: f64,
    pub version: &'static str,
    pub services: Vec<ServiceHealth>,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let services = vec![warehouse_health(&state).await, redis_health(&state)];
    let degraded = services
        .iter()
        .any(|s| s.status == ServiceStatus::Disconnected);

    let report = HealthReport {
        status: if degraded { "degraded" } else { "healthy" },
        timestamp: now_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        version: env!("CARGO_PKG_VERSION"),
        services,
    };
    (StatusCode::OK, Json(report))
}

async fn warehouse_health(state: &AppState) -> ServiceHealth {
    let Some(warehouse) = &state.warehouse else {
        return ServiceHealth {
            name: "warehouse",
            status: ServiceStatus::NotConfigured,
            latency_ms: None,
            error: None,
        };
    };

    let started = Instant::now();
    let outcome = with_optional_deadline(state.queries.timeout(), warehouse.health_check()).await;
    let latency_ms = Some(started.elapsed().as_millis() as u64);
    match outcome {
        Ok(()) => ServiceHealth {
            name: "warehouse",
            status: ServiceStatus::Connected,
            latency_ms,
            error: None,
        },
        Err(e) => {
            tracing::warn!(source = warehouse.name(), error = %e, "Warehouse health check failed");
            ServiceHealth {
                name: "warehouse",
                status: ServiceStatus::Disconnected,
                latency_ms,
                error: Some(e.to_string()),
            }
        }
    }
}

fn redis_health(state: &AppState) -> ServiceHealth {
    let status = match state.cache.tier_state() {
        TierState::Unconfigured => ServiceStatus::NotConfigured,
        TierState::Available => ServiceStatus::Connected,
        TierState::Downgraded | TierState::Closed => ServiceStatus::Disconnected,
    };
    ServiceHealth {
        name: "redis",
        status,
        latency_ms: None,
        error: None,
    }
}

pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "alive" })))
}

pub async fn ready() -> impl IntoResponse {
    // The cache always has its local tier, so the process is ready once serving.
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

#[derive(Debug, Serialize)]
pub struct CacheStatsView {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_rate: f64,
}

pub async fn cache_stats(State(state): State<AppState>) -> ApiResponse<CacheStatsView> {
    let stats = state.cache.stats();
    ApiResponse::ok(CacheStatsView {
        hit_rate: stats.hit_rate(),
        stats,
    })
}

pub async fn prometheus() -> ApiResult<impl IntoResponse> {
    let body = render_metrics().ok_or_else(|| ApiError::Unavailable("metrics recorder is not installed".into()))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

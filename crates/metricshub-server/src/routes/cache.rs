use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::ApiResponse;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    /// Glob over cache keys, e.g. `users-metrics-v2:*`.
    pub pattern: String,
}

pub async fn invalidate(
    State(state): State<AppState>,
    body: Result<Json<InvalidateRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Value>> {
    let Json(req) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let pattern = req.pattern.trim();
    if pattern.is_empty() {
        return Err(ApiError::bad_request("pattern must not be empty"));
    }

    let removed = state.cache.clear_pattern(pattern).await;
    tracing::info!(pattern, removed, "Cache invalidated by pattern");
    Ok(ApiResponse::ok(json!({ "pattern": pattern, "removed": removed })))
}

pub async fn delete_key(State(state): State<AppState>, Path(key): Path<String>) -> ApiResponse<Value> {
    state.cache.delete(&key).await;
    tracing::info!(key = %key, "Cache key deleted");
    ApiResponse::ok(json!({ "key": key }))
}

pub async fn clear_all(State(state): State<AppState>) -> ApiResponse<Value> {
    state.cache.clear_all().await;
    ApiResponse::ok(json!({ "cleared": true }))
}

//! HTTP route handlers.

pub mod cache;
pub mod health;
pub mod reports;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metricshub_analytics::Cached;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Success envelope shared by the data endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            cached: None,
            timestamp: now_rfc3339(),
        }
    }
}

impl<T: Serialize> From<Cached<T>> for ApiResponse<T> {
    fn from(cached: Cached<T>) -> Self {
        Self {
            cached: Some(cached.cached),
            ..Self::ok(cached.data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

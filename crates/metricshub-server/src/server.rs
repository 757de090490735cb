use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use metricshub_analytics::QuerySource;
use metricshub_cache::TieredCache;
use metricshub_config::{AppConfig, QueryConfig};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{metrics, routes};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TieredCache>,
    /// Warehouse client; report endpoints answer 503 without one.
    pub warehouse: Option<Arc<dyn QuerySource>>,
    pub queries: QueryConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(cache: Arc<TieredCache>) -> Self {
        Self {
            cache,
            warehouse: None,
            queries: QueryConfig::default(),
            started_at: Instant::now(),
        }
    }

    pub fn with_warehouse(mut self, warehouse: Arc<dyn QuerySource>) -> Self {
        self.warehouse = Some(warehouse);
        self
    }

    pub fn with_queries(mut self, queries: QueryConfig) -> Self {
        self.queries = queries;
        self
    }
}

pub fn build_app(state: AppState, body_limit: usize) -> Router {
    Router::new()
        // Health and observability
        .route("/api/health", get(routes::health::health))
        .route("/api/health/live", get(routes::health::live))
        .route("/api/health/ready", get(routes::health::ready))
        .route("/api/health/cache", get(routes::health::cache_stats))
        .route("/metrics", get(routes::health::prometheus))
        // Reports
        .route("/api/metrics/engagement", get(routes::reports::engagement))
        // Cache administration
        .route("/api/cache", delete(routes::cache::clear_all))
        .route("/api/cache/invalidate", post(routes::cache::invalidate))
        .route("/api/cache/{key}", delete(routes::cache::delete_key))
        .route_layer(middleware::from_fn(metrics::track_http))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = tracing::field::Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("http.status_code", res.status().as_u16());
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct MetricsHubServer {
    addr: SocketAddr,
    app: Router,
    cache: Arc<TieredCache>,
}

/// Assembles a [`MetricsHubServer`].
///
/// No warehouse client ships with this crate; embedders supply one through
/// [`ServerBuilder::with_warehouse`]. Without it, report endpoints answer 503
/// and `/api/health` lists the warehouse as `not_configured`, which is how the
/// stock `metricshub-server` binary runs.
pub struct ServerBuilder {
    config: AppConfig,
    warehouse: Option<Arc<dyn QuerySource>>,
    cache: Option<Arc<TieredCache>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            warehouse: None,
            cache: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn with_warehouse(mut self, warehouse: Arc<dyn QuerySource>) -> Self {
        self.warehouse = Some(warehouse);
        self
    }

    /// Uses an existing cache instead of connecting one from configuration.
    pub fn with_cache(mut self, cache: Arc<TieredCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn build(self) -> MetricsHubServer {
        let cache = match self.cache {
            Some(cache) => cache,
            None => Arc::new(TieredCache::connect(&self.config.redis, &self.config.cache).await),
        };

        let mut state = AppState::new(cache.clone()).with_queries(self.config.queries.clone());
        if let Some(warehouse) = self.warehouse {
            state = state.with_warehouse(warehouse);
        }

        MetricsHubServer {
            addr: self.config.addr(),
            app: build_app(state, self.config.server.body_limit_bytes),
            cache,
        }
    }
}

impl MetricsHubServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.cache.close().await;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

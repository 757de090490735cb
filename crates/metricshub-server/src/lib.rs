pub mod error;
pub mod metrics;
pub mod observability;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use observability::{apply_logging_level, init_tracing, init_tracing_with_level};
pub use server::{AppState, MetricsHubServer, ServerBuilder, build_app};

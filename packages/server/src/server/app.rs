//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    active_jobs_handler, add_single_vehicle_handler, cancel_job_handler, get_job_handler,
    health_handler, job_logs_handler, list_jobs_handler, submit_job_handler,
};

/// Headroom on top of the single vehicle scraper timeout before the request is dropped
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(30);

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub server_deps: Arc<ServerDeps>,
    /// Pool stats for the health endpoint; None when running on in-memory stores
    pub db_pool: Option<PgPool>,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
}

/// Build the Axum application router
pub fn build_app(
    server_deps: ServerDeps,
    db_pool: Option<PgPool>,
    allowed_origins: &[String],
) -> Router {
    let request_timeout = server_deps.scraper.single_vehicle_timeout + REQUEST_TIMEOUT_SLACK;

    let app_state = AxumAppState {
        server_deps: Arc::new(server_deps),
        db_pool,
    };

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/admin/scraper-jobs",
            get(list_jobs_handler).post(submit_job_handler),
        )
        .route("/admin/scraper-jobs/active", get(active_jobs_handler))
        .route("/admin/scraper-jobs/:id", get(get_job_handler))
        .route("/admin/scraper-jobs/:id/cancel", post(cancel_job_handler))
        .route("/admin/scraper-jobs/:id/logs", get(job_logs_handler))
        .route("/admin/vehicles/add-single", post(add_single_vehicle_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

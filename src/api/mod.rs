//! REST API for the scan dashboard
//!
//! Plays the role of the interactive controls: every request carries the
//! viewer's filter changes and gets back a freshly computed view.

pub mod handlers;
pub mod service;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use service::DashboardService;

pub fn router(service: Arc<DashboardService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = service.config().max_upload_bytes;

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/shifts", get(handlers::get_shifts))
        .route(
            "/api/v1/datasets",
            post(handlers::upload_dataset).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/dashboard", get(handlers::get_dashboard))
        .route("/api/v1/groups/:code", get(handlers::get_group))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

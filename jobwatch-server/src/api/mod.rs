//! API Module
//!
//! Thin HTTP adapter over [`JobWatch`]. Handlers only parse input and map
//! errors; all behaviour lives in the service layer.

pub mod error;
pub mod health;
pub mod job;
pub mod session;

use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::JobWatch;

/// Create the main API router with all endpoints
pub fn create_router(watch: Arc<JobWatch>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(job::SESSION_HEADER),
        ]);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::failure_metrics))
        .route("/connect", post(session::connect))
        .route("/jobs", get(job::list_jobs))
        .with_state(watch)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

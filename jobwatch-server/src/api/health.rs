//! Health and Metrics API Handlers

use axum::{Json, extract::State};
use jobwatch_core::dto::metrics::FailureCount;
use serde::Serialize;
use std::sync::Arc;

use crate::service::JobWatch;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub polling: bool,
}

/// GET /health
pub async fn health_check(State(watch): State<Arc<JobWatch>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        polling: watch.is_polling(),
    })
}

/// GET /metrics
/// Failure observation counters per database and job
pub async fn failure_metrics(State(watch): State<Arc<JobWatch>>) -> Json<Vec<FailureCount>> {
    Json(watch.failure_counts())
}

//! Job API Handlers

use axum::{Json, extract::State, http::HeaderMap};
use jobwatch_core::domain::job::Job;
use jobwatch_core::domain::session::SessionId;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::service::JobWatch;

/// Header carrying the session identifier
pub const SESSION_HEADER: &str = "session-id";

/// GET /jobs
/// List every job of the session's database
pub async fn list_jobs(
    State(watch): State<Arc<JobWatch>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Job>>> {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(SessionId::from)
        .ok_or_else(|| ApiError::BadRequest("Missing Session-ID header".to_string()))?;

    tracing::debug!("Listing jobs for session {}", session_id);

    let jobs = watch.get_jobs_for_session(&session_id).await?;

    Ok(Json(jobs))
}

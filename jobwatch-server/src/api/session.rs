//! Session API Handlers

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use jobwatch_core::domain::credential::Credential;
use jobwatch_core::dto::session::ConnectResponse;
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::service::JobWatch;

/// POST /connect
/// Probe the database and open a session for it
pub async fn connect(
    State(watch): State<Arc<JobWatch>>,
    payload: Result<Json<Credential>, JsonRejection>,
) -> ApiResult<Json<ConnectResponse>> {
    let Json(credential) = payload?;
    tracing::info!("Connect requested for {}", credential.target());

    let session_id = watch.create_session(credential).await?;

    Ok(Json(ConnectResponse::connected(session_id)))
}

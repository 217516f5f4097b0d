//! Submission upload endpoint
//!
//! `PUT /submit?project=<name>&md5=<checksum>` with the submission
//! bytes as the request body. The checksum is optional; when present
//! and matching a pre-registered record, the bytes are read from their
//! materialized location instead of the body.

use axum::body::Body;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::routing::put;
use axum::{Json, Router};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio_util::io::StreamReader;

use crate::error::{ApiError, ApiResult};
use crate::ingest::classify::SubmissionKind;
use crate::ingest::{gatekeeper, ingest_submission, IngestOutcome};
use crate::AppState;
use cistern_common::db::projects;

#[derive(Debug, Deserialize)]
pub struct SubmitParams {
    /// Target project name.
    pub project: String,
    /// Checksum for pre-registered record lookup.
    #[serde(default)]
    pub md5: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SubmissionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_file_name: Option<String>,
}

/// PUT /submit
pub async fn submit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<SubmitParams>,
    body: Body,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let project = projects::find_project_by_name(&state.ctx.db, &params.project)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no such project: {}", params.project)))?;

    let ip = addr.ip().to_string();
    let stream = StreamReader::new(
        body.into_data_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
    );

    let outcome = ingest_submission(
        &state.ctx,
        stream,
        project.id,
        params.md5.as_deref(),
        Some(&ip),
    )
    .await?;

    let response = match outcome {
        IngestOutcome::Parsed(result) => (
            StatusCode::OK,
            Json(SubmitResponse {
                status: "OK".to_string(),
                message: None,
                kind: Some(result.kind),
                backup_file_name: Some(result.backup_file_name),
            }),
        ),
        IngestOutcome::Dropped => (
            StatusCode::OK,
            Json(SubmitResponse {
                status: "DROPPED".to_string(),
                message: Some("no handler for this submission; nothing was produced".to_string()),
                kind: None,
                backup_file_name: None,
            }),
        ),
        IngestOutcome::Blocked => (
            StatusCode::FORBIDDEN,
            Json(SubmitResponse {
                status: "REJECTED".to_string(),
                message: Some(gatekeeper::REJECTION_MESSAGE.to_string()),
                kind: None,
                backup_file_name: None,
            }),
        ),
    };
    Ok(response)
}

/// Build submission routes
pub fn submit_routes() -> Router<AppState> {
    Router::new().route("/submit", put(submit).post(submit))
}

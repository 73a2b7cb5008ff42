//! HTTP boundary
//!
//! A deliberately thin layer: handlers translate between HTTP and the
//! orchestrator, and [`SendError`] maps onto the `{success: false, error}`
//! response contract. Domain failures never surface as 500s.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::campaigns::{CampaignStatus, SendError, SendSummary};
use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/campaigns/{id}/send", post(send_campaign))
        .route("/campaigns/{id}/pause", post(pause_campaign))
        .route("/campaigns/{id}/resume", post(resume_campaign))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Successful send pass response body
#[derive(Debug, Serialize)]
struct SendResponse {
    success: bool,
    sent_count: u32,
    failed_count: u32,
    total_recipients: u32,
}

impl From<SendSummary> for SendResponse {
    fn from(summary: SendSummary) -> Self {
        Self {
            success: true,
            sent_count: summary.sent_count,
            failed_count: summary.failed_count,
            total_recipients: summary.total_recipients,
        }
    }
}

/// Successful status change response body
#[derive(Debug, Serialize)]
struct StatusResponse {
    success: bool,
    status: CampaignStatus,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

struct ApiError(SendError);

impl From<SendError> for ApiError {
    fn from(err: SendError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SendError::NotFound => StatusCode::NOT_FOUND,
            SendError::InvalidState(_) => StatusCode::CONFLICT,
            SendError::NoRecipients => StatusCode::UNPROCESSABLE_ENTITY,
            SendError::NotConfigured | SendError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorResponse {
            success: false,
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn send_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SendResponse>, ApiError> {
    let summary = state.sender.send(id).await?;
    Ok(Json(summary.into()))
}

async fn pause_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.sender.pause(id).await?;
    Ok(Json(StatusResponse {
        success: true,
        status: CampaignStatus::Paused,
    }))
}

async fn resume_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.sender.resume(id).await?;
    Ok(Json(StatusResponse {
        success: true,
        status,
    }))
}

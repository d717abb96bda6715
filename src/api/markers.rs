//! Suppression marker endpoints

use axum::{
    Json,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{error, info};

use crate::SharedState;

/// GET /api/markers - Jobs whose notification is owned by a pipeline step
pub async fn list_markers(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    match state.notifier.markers().list().await {
        Ok(markers) => Json(markers).into_response(),
        Err(e) => {
            error!("Failed to list markers: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// DELETE /api/markers/{job} - Hand a job back to the automatic notifier
pub async fn clear_marker(
    AxumState(state): AxumState<SharedState>,
    Path(job): Path<String>,
) -> impl IntoResponse {
    match state.notifier.markers().clear(&job).await {
        Ok(true) => {
            info!("Released suppression marker for job '{}'", job);
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Marker not found"})),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to clear marker for job '{}': {}", job, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

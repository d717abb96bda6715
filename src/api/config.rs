//! Global configuration endpoints

use axum::{Json, extract::State as AxumState, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::error;

use crate::SharedState;
use crate::config::ConfigUpdate;

/// GET /api/config - Current global settings
pub async fn get_config(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    Json(state.notifier.global().snapshot())
}

/// PUT /api/config - Apply a partial update to the global settings and save it
pub async fn update_config(
    AxumState(state): AxumState<SharedState>,
    Json(update): Json<ConfigUpdate>,
) -> impl IntoResponse {
    match state.notifier.global().update(update).await {
        Ok(config) => Json(config).into_response(),
        Err(e) => {
            error!("Failed to update global config: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

/// POST /api/reload - Reload global settings from disk
pub async fn reload_config_endpoint(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    let global = state.notifier.global();
    match global.reload().await {
        Ok(_) => Json(json!({
            "status": "success",
            "message": "Configuration reloaded successfully"
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to reload config from {:?}: {}", global.path(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

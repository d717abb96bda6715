//! Service status endpoint

use axum::{Json, extract::State as AxumState, response::IntoResponse};
use serde_json::json;
use tracing::error;

use crate::SharedState;

/// GET /status - Service status and notifier summary
///
/// `suppression_markers` is `null` when the marker database cannot be read.
pub async fn status(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    let markers = match state.notifier.markers().count().await {
        Ok(count) => Some(count),
        Err(e) => {
            error!("Failed to count suppression markers: {}", e);
            None
        }
    };
    let global = state.notifier.global().snapshot();

    Json(json!({
        "server": {
            "name": "opslevel_notify",
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
        },
        "notifier": {
            "enabled": global.enabled(),
            "webhook_configured": !global.webhook_url().is_empty(),
            "ignored_jobs": global.ignored_jobs().count(),
            "suppression_markers": markers,
        }
    }))
}

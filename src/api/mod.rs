//! HTTP surface of the notification service
//!
//! CI hosts report finished runs here; administrators manage the global
//! settings and suppression markers.

pub mod builds;
pub mod config;
pub mod markers;
pub mod stats;

use axum::{Router, routing};

use crate::SharedState;

pub use builds::{build_completed, pipeline_notify};
pub use config::{get_config, reload_config_endpoint, update_config};
pub use markers::{clear_marker, list_markers};
pub use stats::status;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/status", routing::get(status))
        .route("/api/builds/completed", routing::post(build_completed))
        .route("/api/pipeline/notify", routing::post(pipeline_notify))
        .route("/api/config", routing::get(get_config).put(update_config))
        .route("/api/reload", routing::post(reload_config_endpoint))
        .route("/api/markers", routing::get(list_markers))
        .route("/api/markers/{*job}", routing::delete(clear_marker))
        .with_state(state)
}

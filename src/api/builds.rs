//! Build-completion endpoints

use axum::{Json, extract::State as AxumState};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::SharedState;
use crate::config::NotificationConfig;
use crate::console::BuildConsole;
use crate::notifier::NotifyOutcome;
use crate::run::CompletedRun;

/// Result of a notification attempt plus the lines written to the build console.
/// Always sent with `200 OK`: notification never fails the calling build.
#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    #[serde(flatten)]
    pub outcome: NotifyOutcome,
    pub console: BuildConsole,
}

/// Body of a pipeline notify step: the running build plus the step's parameters
#[derive(Debug, Deserialize)]
pub struct PipelineNotifyRequest {
    pub run: CompletedRun,
    #[serde(default)]
    pub config: NotificationConfig,
}

/// POST /api/builds/completed - automatic post-build notification
pub async fn build_completed(
    AxumState(state): AxumState<SharedState>,
    Json(run): Json<CompletedRun>,
) -> Json<NotifyResponse> {
    info!(
        "Run {} #{} completed with {}",
        run.job_name, run.number, run.result
    );

    let mut console = BuildConsole::new();
    let outcome = state.notifier.on_completed(&run, &mut console).await;
    Json(NotifyResponse { outcome, console })
}

/// POST /api/pipeline/notify - explicit notify step from a pipeline
pub async fn pipeline_notify(
    AxumState(state): AxumState<SharedState>,
    Json(request): Json<PipelineNotifyRequest>,
) -> Json<NotifyResponse> {
    let PipelineNotifyRequest { run, config } = request;
    info!(
        "Pipeline notify step for {} #{}",
        run.job_name, run.number
    );

    let mut console = BuildConsole::new();
    let outcome = state
        .notifier
        .pipeline_notify(&run, &config, &mut console)
        .await;
    Json(NotifyResponse { outcome, console })
}

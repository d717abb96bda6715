//! Gates deciding whether the automatic post-build notifier fires for a run.
//!
//! Gates run in a fixed order: build result, enablement, ignore list,
//! pipeline ownership, then webhook target. The first gate that stops a run
//! names the reason; none of them are errors.

use serde::Serialize;
use std::fmt;

use crate::config::NotificationConfig;
use crate::run::{BuildResult, CompletedRun};

/// Why a run did not produce a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuppressionReason {
    /// Result is neither SUCCESS nor UNSTABLE
    ResultNotEligible { result: BuildResult },
    /// The job's own settings turn notification off
    DisabledForJob,
    /// The job has no settings of its own and the global notifier is off
    DisabledGlobally,
    /// The job's display name is on the global ignore list
    IgnoredByName { name: String },
    /// A pipeline notify step already owns notification for this job
    OwnedByPipeline,
    /// No webhook URL after merging job and global settings
    NotConfigured,
}

impl fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppressionReason::ResultNotEligible { result } => {
                write!(f, "run status is {}", result)
            }
            SuppressionReason::DisabledForJob => f.write_str("this project disabled notify"),
            SuppressionReason::DisabledGlobally => f.write_str("it's disabled globally"),
            SuppressionReason::IgnoredByName { name } => write!(
                f,
                "global configuration says to ignore builds named \"{}\"",
                name
            ),
            SuppressionReason::OwnedByPipeline => {
                f.write_str("pipeline contained OpsLevel notify step")
            }
            SuppressionReason::NotConfigured => f.write_str("webhook URL not configured"),
        }
    }
}

impl SuppressionReason {
    /// Whether the reason is worth a line in the build console
    pub fn shown_on_console(&self) -> bool {
        matches!(
            self,
            SuppressionReason::DisabledForJob
                | SuppressionReason::IgnoredByName { .. }
                | SuppressionReason::NotConfigured
        )
    }
}

/// Outcome of running the gates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// All gates passed; carries the merged, effective settings
    Notify(NotificationConfig),
    Suppress(SuppressionReason),
}

/// Run every gate for `run` against a snapshot of the global settings.
///
/// `owned_by_pipeline` is the job's suppression marker.
pub fn evaluate(
    run: &CompletedRun,
    global: &NotificationConfig,
    owned_by_pipeline: bool,
) -> Decision {
    if !run.result.counts_as_deploy() {
        return Decision::Suppress(SuppressionReason::ResultNotEligible { result: run.result });
    }

    let job_config = match &run.job_config {
        Some(config) if !config.enabled() => {
            return Decision::Suppress(SuppressionReason::DisabledForJob);
        }
        Some(config) => config.clone(),
        None if !global.enabled() => {
            return Decision::Suppress(SuppressionReason::DisabledGlobally);
        }
        None => NotificationConfig::default(),
    };

    let display_name = run.display_name();
    if let Some(name) = global.ignored_jobs().find(|name| *name == display_name) {
        return Decision::Suppress(SuppressionReason::IgnoredByName {
            name: name.to_string(),
        });
    }

    if owned_by_pipeline {
        return Decision::Suppress(SuppressionReason::OwnedByPipeline);
    }

    let effective = job_config.layered_over(global);
    if effective.webhook_url().is_empty() {
        return Decision::Suppress(SuppressionReason::NotConfigured);
    }

    Decision::Notify(effective)
}

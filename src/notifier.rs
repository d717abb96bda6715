//! Drives one notification attempt per completed run: gates, merge, payload,
//! delivery. Nothing here can change the result of the build that triggered it;
//! every path ends in a [`NotifyOutcome`].

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{GlobalConfigStore, NotificationConfig};
use crate::console::BuildConsole;
use crate::db::SqlMarkerStore;
use crate::delivery::WebhookClient;
use crate::payload::DeployEvent;
use crate::run::CompletedRun;
use crate::suppression::{Decision, SuppressionReason, evaluate};

const CONSOLE_PREFIX: &str = "OpsLevel notifier: skipping because";

/// Terminal state of a notification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotifyOutcome {
    Suppressed { reason: SuppressionReason },
    /// The webhook answered; `status` may still be non-2xx
    Delivered { status: u16 },
    DeliveryFailed { reason: String },
}

impl NotifyOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, NotifyOutcome::Delivered { .. })
    }
}

#[derive(Clone)]
pub struct Notifier {
    global: Arc<GlobalConfigStore>,
    markers: SqlMarkerStore,
    client: WebhookClient,
}

impl Notifier {
    pub fn new(
        global: Arc<GlobalConfigStore>,
        markers: SqlMarkerStore,
        client: WebhookClient,
    ) -> Self {
        Self {
            global,
            markers,
            client,
        }
    }

    pub fn global(&self) -> &GlobalConfigStore {
        &self.global
    }

    pub fn markers(&self) -> &SqlMarkerStore {
        &self.markers
    }

    /// Automatic post-build notification for a finished run.
    pub async fn on_completed(
        &self,
        run: &CompletedRun,
        console: &mut BuildConsole,
    ) -> NotifyOutcome {
        let global = self.global.snapshot();
        let owned_by_pipeline = self.owned_by_pipeline(&run.job_name).await;

        match evaluate(run, &global, owned_by_pipeline) {
            Decision::Suppress(reason) => suppressed(run, reason, console),
            Decision::Notify(config) => self.publish(run, &config, console).await,
        }
    }

    /// Notification from an explicit pipeline step.
    ///
    /// Takes ownership of notification for the job, so later automatic
    /// notifications for it are suppressed. Enablement and the ignore list do
    /// not apply to an explicit step.
    pub async fn pipeline_notify(
        &self,
        run: &CompletedRun,
        step_config: &NotificationConfig,
        console: &mut BuildConsole,
    ) -> NotifyOutcome {
        if let Err(e) = self.markers.mark(&run.job_name).await {
            error!(
                "Could not record pipeline ownership for job '{}': {}",
                run.job_name, e
            );
        }

        let effective = step_config.layered_over(&self.global.snapshot());
        if effective.webhook_url().is_empty() {
            return suppressed(run, SuppressionReason::NotConfigured, console);
        }

        self.publish(run, &effective, console).await
    }

    async fn owned_by_pipeline(&self, job_name: &str) -> bool {
        match self.markers.is_marked(job_name).await {
            Ok(marked) => marked,
            Err(e) => {
                error!(
                    "Could not read suppression marker for job '{}', assuming none: {}",
                    job_name, e
                );
                false
            }
        }
    }

    async fn publish(
        &self,
        run: &CompletedRun,
        config: &NotificationConfig,
        console: &mut BuildConsole,
    ) -> NotifyOutcome {
        let event = DeployEvent::assemble(config, run).await;
        let webhook_url = config.webhook_url();
        console.println(format!("Publishing deploy to OpsLevel via: {}", webhook_url));

        match self.client.deliver(webhook_url, &event, console).await {
            Ok(receipt) => {
                info!(
                    "Published deploy {} of '{}' to OpsLevel (HTTP {})",
                    event.deploy_number, run.job_name, receipt.status
                );
                NotifyOutcome::Delivered {
                    status: receipt.status,
                }
            }
            Err(e) => {
                let message = format!("{}. Could not publish deploy to OpsLevel.", e);
                warn!("{}", message);
                console.println(format!("Error: {}", message));
                NotifyOutcome::DeliveryFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn suppressed(
    run: &CompletedRun,
    reason: SuppressionReason,
    console: &mut BuildConsole,
) -> NotifyOutcome {
    let message = format!("{} {}", CONSOLE_PREFIX, reason);
    if reason == SuppressionReason::NotConfigured {
        warn!("{} (job '{}')", message, run.job_name);
    } else {
        debug!("{} (job '{}')", message, run.job_name);
    }
    if reason.shown_on_console() {
        console.println(message);
    }
    NotifyOutcome::Suppressed { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::run::BuildResult;

    async fn notifier(global: NotificationConfig) -> (tempfile::TempDir, Notifier) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_db(dir.path().join("markers.db")).await.unwrap();
        let store = GlobalConfigStore::with_config(dir.path().join("opslevel.toml"), global);
        let notifier = Notifier::new(
            Arc::new(store),
            SqlMarkerStore::new(pool),
            WebhookClient::default(),
        );
        (dir, notifier)
    }

    #[tokio::test]
    async fn failure_is_silent() {
        let (_dir, notifier) =
            notifier(NotificationConfig::new().with_webhook_url("http://127.0.0.1:9/")).await;
        let mut console = BuildConsole::new();
        let run = CompletedRun::new("test0", 1, BuildResult::Failure);

        let outcome = notifier.on_completed(&run, &mut console).await;
        assert_eq!(
            outcome,
            NotifyOutcome::Suppressed {
                reason: SuppressionReason::ResultNotEligible {
                    result: BuildResult::Failure
                }
            }
        );
        assert!(console.lines().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_webhook_is_reported() {
        let (_dir, notifier) = notifier(NotificationConfig::new()).await;
        let mut console = BuildConsole::new();
        let run = CompletedRun::new("test0", 1, BuildResult::Success);

        let outcome = notifier.on_completed(&run, &mut console).await;
        assert_eq!(
            outcome,
            NotifyOutcome::Suppressed {
                reason: SuppressionReason::NotConfigured
            }
        );
        assert!(console.contains("skipping because webhook URL not configured"));
    }

    #[tokio::test]
    async fn job_disable_prints_to_console() {
        let (_dir, notifier) =
            notifier(NotificationConfig::new().with_webhook_url("http://127.0.0.1:9/")).await;
        let mut console = BuildConsole::new();
        let run = CompletedRun::new("test0", 1, BuildResult::Success)
            .with_job_config(NotificationConfig::new().with_enabled(false));

        notifier.on_completed(&run, &mut console).await;
        assert_eq!(
            console.lines(),
            ["OpsLevel notifier: skipping because this project disabled notify"]
        );
    }

    #[tokio::test]
    async fn ignore_list_prints_name() {
        let global = NotificationConfig::new()
            .with_webhook_url("http://127.0.0.1:9/")
            .with_ignore_list("test0");
        let (_dir, notifier) = notifier(global).await;
        let mut console = BuildConsole::new();
        let run = CompletedRun::new("test0", 1, BuildResult::Success);

        notifier.on_completed(&run, &mut console).await;
        assert!(console.contains(
            "skipping because global configuration says to ignore builds named \"test0\""
        ));
    }

    #[tokio::test]
    async fn invalid_webhook_fails_without_network() {
        let (_dir, notifier) =
            notifier(NotificationConfig::new().with_webhook_url("not a url")).await;
        let mut console = BuildConsole::new();
        let run = CompletedRun::new("test0", 1, BuildResult::Success);

        let outcome = notifier.on_completed(&run, &mut console).await;
        assert!(matches!(outcome, NotifyOutcome::DeliveryFailed { .. }));
        assert!(console.contains("Publishing deploy to OpsLevel via: not a url"));
        assert!(console.contains("Could not publish deploy to OpsLevel."));
    }

    #[tokio::test]
    async fn pipeline_step_marks_job_even_without_webhook() {
        let (_dir, notifier) = notifier(NotificationConfig::new()).await;
        let mut console = BuildConsole::new();
        let run = CompletedRun::new("pipeline", 3, BuildResult::Success);

        let outcome = notifier
            .pipeline_notify(&run, &NotificationConfig::new(), &mut console)
            .await;
        assert_eq!(
            outcome,
            NotifyOutcome::Suppressed {
                reason: SuppressionReason::NotConfigured
            }
        );
        assert!(notifier.markers().is_marked("pipeline").await.unwrap());

        let global_enabled = GlobalConfigStore::with_config(
            "unused.toml",
            NotificationConfig::new().with_webhook_url("http://127.0.0.1:9/"),
        );
        let notifier = Notifier::new(
            Arc::new(global_enabled),
            notifier.markers().clone(),
            WebhookClient::default(),
        );
        let outcome = notifier.on_completed(&run, &mut console).await;
        assert_eq!(
            outcome,
            NotifyOutcome::Suppressed {
                reason: SuppressionReason::OwnedByPipeline
            }
        );
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let value = serde_json::to_value(NotifyOutcome::Suppressed {
            reason: SuppressionReason::IgnoredByName {
                name: "test0".to_string(),
            },
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "outcome": "suppressed",
                "reason": {"kind": "ignored_by_name", "name": "test0"}
            })
        );
    }
}

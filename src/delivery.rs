//! Delivery of deploy events to the OpsLevel webhook.
//!
//! One POST per event, no retries. Whatever the webhook answers, including
//! non-2xx statuses, is echoed verbatim to the build console.

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::console::BuildConsole;
use crate::error::{NotifyError, Result};
use crate::payload::DeployEvent;

/// Identifies the sending agent in the `agent` query parameter
pub const AGENT_ID: &str = "jenkins";
pub const RESPONSE_LABEL: &str = "OpsLevel Response: ";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// `<agent>-<version>`, with an empty version if the package metadata is missing.
pub fn agent_tag() -> String {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or_default();
    format!("{}-{}", AGENT_ID, version)
}

/// Validate a configured webhook URL and tag it with the agent parameter.
pub fn webhook_target(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(NotifyError::ConfigError(
            "webhook URL not configured".to_string(),
        ));
    }

    let mut url = Url::parse(raw).map_err(|e| NotifyError::InvalidWebhookUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(NotifyError::InvalidWebhookUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    url.query_pairs_mut().append_pair("agent", &agent_tag());
    Ok(url)
}

/// What the webhook answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub url: Url,
    pub status: u16,
    pub body: String,
}

impl DeliveryReceipt {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the OpsLevel deploy webhook
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
}

impl Default for WebhookClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// POST `event` to `url`.
    ///
    /// Fails without touching the network when `url` is empty or malformed.
    /// A transport failure is logged with the target and returned; it is never
    /// retried.
    pub async fn deliver(
        &self,
        url: &str,
        event: &DeployEvent,
        console: &mut BuildConsole,
    ) -> Result<DeliveryReceipt> {
        let target = webhook_target(url)?;
        let body = serde_json::to_string(event)?;
        debug!("Sending OpsLevel deploy payload:\n{}", body);

        let response = self
            .client
            .post(target.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!("Invocation of OpsLevel webhook {} failed: {}", target, e);
                NotifyError::from(e)
            })?;

        let status = response.status();
        debug!("Invocation of OpsLevel webhook {} returned {}", target, status);

        let text = response.text().await.map_err(|e| {
            warn!(
                "Could not read response from OpsLevel webhook {}: {}",
                target, e
            );
            NotifyError::MalformedResponse(e.to_string())
        })?;

        let message = format!("{}{}", RESPONSE_LABEL, text);
        console.println(message.clone());
        if status.is_success() {
            info!("{}", message);
        } else {
            warn!("OpsLevel webhook {} answered {}: {}", target, status, text);
        }

        Ok(DeliveryReceipt {
            url: target,
            status: status.as_u16(),
            body: text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_tag_carries_package_version() {
        assert_eq!(agent_tag(), format!("jenkins-{}", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn target_appends_agent_parameter() {
        let url = webhook_target("http://127.0.0.1:8080/").unwrap();
        assert_eq!(
            url.as_str(),
            format!("http://127.0.0.1:8080/?agent={}", agent_tag())
        );
    }

    #[test]
    fn target_keeps_existing_query() {
        let url = webhook_target(" https://app.opslevel.com/integrations/deploy/abc?x=1 ").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("x".to_string(), "1".to_string()),
                ("agent".to_string(), agent_tag()),
            ]
        );
    }

    #[test]
    fn empty_target_is_a_config_error() {
        assert!(matches!(
            webhook_target("   "),
            Err(NotifyError::ConfigError(_))
        ));
    }

    #[test]
    fn malformed_targets_are_rejected() {
        for raw in ["not a url", "/relative/path", "ftp://example.com/hook", "mailto:a@b.c"] {
            assert!(
                matches!(
                    webhook_target(raw),
                    Err(NotifyError::InvalidWebhookUrl { .. })
                ),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn receipt_success_range() {
        let url = Url::parse("http://localhost/").unwrap();
        let receipt = |status| DeliveryReceipt {
            url: url.clone(),
            status,
            body: String::new(),
        };
        assert!(receipt(200).is_success());
        assert!(receipt(204).is_success());
        assert!(!receipt(404).is_success());
    }

    #[tokio::test]
    async fn invalid_target_never_touches_console() {
        let client = WebhookClient::default();
        let event = DeployEvent::build(
            &crate::config::NotificationConfig::new(),
            &crate::run::CompletedRun::new("test0", 1, crate::run::BuildResult::Success),
            None,
            chrono::Utc::now(),
        );
        let mut console = BuildConsole::new();

        let result = client.deliver("not a url", &event, &mut console).await;
        assert!(matches!(result, Err(NotifyError::InvalidWebhookUrl { .. })));
        assert!(console.lines().is_empty());
    }
}

//! Notification settings, the merge that layers job settings over global
//! settings, and the file-backed global settings store.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{NotifyError, Result};

fn default_enabled() -> bool {
    true
}

/// Deserialize a string field, trimming it and mapping `null` to empty.
fn trimmed<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()).unwrap_or_default())
}

fn clean(value: impl AsRef<str>) -> String {
    value.as_ref().trim().to_string()
}

/// One set of OpsLevel notification settings, either for a single job or the
/// global defaults. String fields are always trimmed; empty means "unset".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(deserialize_with = "trimmed")]
    webhook_url: String,
    #[serde(deserialize_with = "trimmed")]
    service_alias: String,
    #[serde(deserialize_with = "trimmed")]
    environment_label: String,
    #[serde(deserialize_with = "trimmed")]
    description: String,
    #[serde(deserialize_with = "trimmed")]
    deploy_url: String,
    #[serde(deserialize_with = "trimmed")]
    deployer_id: String,
    #[serde(deserialize_with = "trimmed")]
    deployer_name: String,
    #[serde(deserialize_with = "trimmed")]
    deployer_email: String,
    #[serde(deserialize_with = "trimmed")]
    ignore_list: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: String::new(),
            service_alias: String::new(),
            environment_label: String::new(),
            description: String::new(),
            deploy_url: String::new(),
            deployer_id: String::new(),
            deployer_name: String::new(),
            deployer_email: String::new(),
            ignore_list: String::new(),
        }
    }
}

impl NotificationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_webhook_url(mut self, value: impl AsRef<str>) -> Self {
        self.webhook_url = clean(value);
        self
    }

    pub fn with_service_alias(mut self, value: impl AsRef<str>) -> Self {
        self.service_alias = clean(value);
        self
    }

    pub fn with_environment_label(mut self, value: impl AsRef<str>) -> Self {
        self.environment_label = clean(value);
        self
    }

    pub fn with_description(mut self, value: impl AsRef<str>) -> Self {
        self.description = clean(value);
        self
    }

    pub fn with_deploy_url(mut self, value: impl AsRef<str>) -> Self {
        self.deploy_url = clean(value);
        self
    }

    pub fn with_deployer_id(mut self, value: impl AsRef<str>) -> Self {
        self.deployer_id = clean(value);
        self
    }

    pub fn with_deployer_name(mut self, value: impl AsRef<str>) -> Self {
        self.deployer_name = clean(value);
        self
    }

    pub fn with_deployer_email(mut self, value: impl AsRef<str>) -> Self {
        self.deployer_email = clean(value);
        self
    }

    pub fn with_ignore_list(mut self, value: impl AsRef<str>) -> Self {
        self.ignore_list = clean(value);
        self
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    pub fn service_alias(&self) -> &str {
        &self.service_alias
    }

    pub fn environment_label(&self) -> &str {
        &self.environment_label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn deploy_url(&self) -> &str {
        &self.deploy_url
    }

    pub fn deployer_id(&self) -> &str {
        &self.deployer_id
    }

    pub fn deployer_name(&self) -> &str {
        &self.deployer_name
    }

    pub fn deployer_email(&self) -> &str {
        &self.deployer_email
    }

    pub fn ignore_list(&self) -> &str {
        &self.ignore_list
    }

    /// Job names listed in the comma-separated ignore list, trimmed, blanks dropped.
    pub fn ignored_jobs(&self) -> impl Iterator<Item = &str> {
        self.ignore_list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Layer `self` over `general`: every non-empty field of `self` wins, empty
    /// fields fall back to `general`. `enabled` is kept from `self`.
    pub fn layered_over(&self, general: &NotificationConfig) -> NotificationConfig {
        fn pick(specific: &str, general: &str) -> String {
            if specific.is_empty() {
                general.to_string()
            } else {
                specific.to_string()
            }
        }

        NotificationConfig {
            enabled: self.enabled,
            webhook_url: pick(&self.webhook_url, &general.webhook_url),
            service_alias: pick(&self.service_alias, &general.service_alias),
            environment_label: pick(&self.environment_label, &general.environment_label),
            description: pick(&self.description, &general.description),
            deploy_url: pick(&self.deploy_url, &general.deploy_url),
            deployer_id: pick(&self.deployer_id, &general.deployer_id),
            deployer_name: pick(&self.deployer_name, &general.deployer_name),
            deployer_email: pick(&self.deployer_email, &general.deployer_email),
            ignore_list: pick(&self.ignore_list, &general.ignore_list),
        }
    }

    /// Replace exactly the fields present in `update`.
    pub fn apply_update(&mut self, update: ConfigUpdate) {
        let ConfigUpdate {
            enabled,
            webhook_url,
            service_alias,
            environment_label,
            description,
            deploy_url,
            deployer_id,
            deployer_name,
            deployer_email,
            ignore_list,
        } = update;

        if let Some(enabled) = enabled {
            self.enabled = enabled;
        }
        let fields = [
            (webhook_url, &mut self.webhook_url),
            (service_alias, &mut self.service_alias),
            (environment_label, &mut self.environment_label),
            (description, &mut self.description),
            (deploy_url, &mut self.deploy_url),
            (deployer_id, &mut self.deployer_id),
            (deployer_name, &mut self.deployer_name),
            (deployer_email, &mut self.deployer_email),
            (ignore_list, &mut self.ignore_list),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = clean(value);
            }
        }
    }
}

/// Merge a specific config over a general one. See [`NotificationConfig::layered_over`].
pub fn merge(specific: &NotificationConfig, general: &NotificationConfig) -> NotificationConfig {
    specific.layered_over(general)
}

/// Partial update of the global settings, as submitted by an administrator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    pub enabled: Option<bool>,
    pub webhook_url: Option<String>,
    pub service_alias: Option<String>,
    pub environment_label: Option<String>,
    pub description: Option<String>,
    pub deploy_url: Option<String>,
    pub deployer_id: Option<String>,
    pub deployer_name: Option<String>,
    pub deployer_email: Option<String>,
    pub ignore_list: Option<String>,
}

/// Process-wide global settings, persisted as TOML.
///
/// Readers always work from [`GlobalConfigStore::snapshot`], so an update
/// landing mid-evaluation never changes the values a notification sees.
/// Writers (`update`, `reload`) are serialized so the file on disk always
/// matches the in-memory record once they return.
pub struct GlobalConfigStore {
    path: PathBuf,
    config: RwLock<NotificationConfig>,
    write_lock: Mutex<()>,
}

impl GlobalConfigStore {
    /// Load the store from `path`. A missing file yields the default settings.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = read_config_file(&path).await?;
        Ok(Self {
            path,
            config: RwLock::new(config),
            write_lock: Mutex::new(()),
        })
    }

    /// In-memory store seeded with `config`; saves go to `path`.
    pub fn with_config(path: impl Into<PathBuf>, config: NotificationConfig) -> Self {
        Self {
            path: path.into(),
            config: RwLock::new(config),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current global settings.
    pub fn snapshot(&self) -> NotificationConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Apply an administrative update and persist the result.
    pub async fn update(&self, update: ConfigUpdate) -> Result<NotificationConfig> {
        let _guard = self.write_lock.lock().await;
        let updated = {
            let mut config = self
                .config
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            config.apply_update(update);
            config.clone()
        };
        self.save(&updated).await?;
        info!("Global OpsLevel configuration updated");
        Ok(updated)
    }

    /// Re-read the settings file, replacing the in-memory record.
    pub async fn reload(&self) -> Result<NotificationConfig> {
        let _guard = self.write_lock.lock().await;
        let fresh = read_config_file(&self.path).await?;
        {
            let mut config = self
                .config
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *config = fresh.clone();
        }
        info!("Global OpsLevel configuration reloaded from {:?}", self.path);
        Ok(fresh)
    }

    async fn save(&self, config: &NotificationConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let contents = toml::to_string_pretty(config)?;
        // write then rename, so readers never see a partial file
        let staging = self.path.with_extension("toml.tmp");
        fs::write(&staging, contents).await?;
        fs::rename(&staging, &self.path).await?;
        debug!("Saved global OpsLevel configuration to {:?}", self.path);
        Ok(())
    }
}

async fn read_config_file(path: &Path) -> Result<NotificationConfig> {
    if !fs::try_exists(path).await? {
        info!(
            "No global OpsLevel configuration at {:?}, using defaults",
            path
        );
        return Ok(NotificationConfig::default());
    }

    let contents = fs::read_to_string(path).await.map_err(|e| {
        NotifyError::ConfigError(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    toml::from_str(&contents).map_err(|e| {
        NotifyError::ConfigError(format!("Failed to parse config file {:?}: {}", path, e))
    })
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::NotificationConfig;

/// Terminal result of a build, as reported by the CI host
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl BuildResult {
    /// Unstable builds may still have deployed, depending on how the job is set up.
    pub fn counts_as_deploy(self) -> bool {
        matches!(self, BuildResult::Success | BuildResult::Unstable)
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Failure => "FAILURE",
            BuildResult::NotBuilt => "NOT_BUILT",
            BuildResult::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// A finished build run, as handed over by the CI host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedRun {
    pub result: BuildResult,
    pub number: u64,
    pub job_name: String,
    #[serde(default)]
    pub full_display_name: Option<String>,
    /// Run URL relative to the host root, e.g. `job/test0/1/`
    pub url: String,
    /// Only known when the host's own base URL is configured
    #[serde(default)]
    pub absolute_url: Option<String>,
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Settings from the job's post-build action, if it has one
    #[serde(default)]
    pub job_config: Option<NotificationConfig>,
}

impl CompletedRun {
    /// Create a run with no environment, workspace or job settings
    pub fn new(job_name: impl Into<String>, number: u64, result: BuildResult) -> Self {
        let job_name = job_name.into();
        Self {
            url: format!("job/{}/{}/", job_name, number),
            result,
            number,
            job_name,
            full_display_name: None,
            absolute_url: None,
            workspace: None,
            env: HashMap::new(),
            job_config: None,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_job_config(mut self, config: NotificationConfig) -> Self {
        self.job_config = Some(config);
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn with_absolute_url(mut self, url: impl Into<String>) -> Self {
        self.absolute_url = Some(url.into());
        self
    }

    /// Name matched against the global ignore list. A blank display name
    /// falls back to the job name.
    pub fn display_name(&self) -> &str {
        self.full_display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.job_name.trim())
    }

    /// Build environment, with `BUILD_NUMBER` and `JOB_NAME` filled in when the
    /// host did not provide them.
    pub fn environment(&self) -> HashMap<String, String> {
        let mut env = self.env.clone();
        env.entry("BUILD_NUMBER".to_string())
            .or_insert_with(|| self.number.to_string());
        env.entry("JOB_NAME".to_string())
            .or_insert_with(|| self.job_name.clone());
        env
    }

    /// Directory for version-control lookups
    pub fn workspace_dir(&self) -> Option<PathBuf> {
        self.workspace
            .clone()
            .or_else(|| self.env.get("WORKSPACE").map(PathBuf::from))
    }
}

//! The deploy event document sent to OpsLevel, and how each of its fields is
//! resolved from the effective settings and the completed run.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::git;
use crate::run::CompletedRun;
use crate::substitute::substitute;

pub const DEFAULT_ENVIRONMENT: &str = "Production";
pub const DEFAULT_DESCRIPTION: &str = "Jenkins Deploy #${BUILD_NUMBER}";
/// Prefix for derived service aliases, following kubernetes-style naming
pub const SERVICE_PREFIX: &str = "jenkins:";
/// Stands in for the host location when the host has no base URL configured
pub const UNSET_LOCATION_BASE: &str = "http://jenkins-location-is-not-set.local/";

/// One completed deployment, as OpsLevel expects it
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeployEvent {
    pub dedup_id: Uuid,
    pub deploy_number: String,
    pub deploy_url: String,
    pub deployed_at: String,
    pub description: String,
    pub environment: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployer: Option<Deployer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<Commit>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Deployer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeployEvent {
    /// Resolve the event for `run`, reading the commit subject from the
    /// workspace when the run carries a commit.
    pub async fn assemble(config: &NotificationConfig, run: &CompletedRun) -> DeployEvent {
        let env = run.environment();
        let commit_subject = match (non_empty(env.get("GIT_COMMIT")), run.workspace_dir()) {
            (Some(_), Some(workspace)) => git::commit_subject(&workspace).await,
            (Some(_), None) => {
                debug!(
                    "No workspace for {} #{}, skipping commit message lookup",
                    run.job_name, run.number
                );
                None
            }
            (None, _) => None,
        };
        Self::build(config, run, commit_subject, Utc::now())
    }

    /// Resolve every field. Pure apart from the generated dedup id.
    pub fn build(
        config: &NotificationConfig,
        run: &CompletedRun,
        commit_subject: Option<String>,
        now: DateTime<Utc>,
    ) -> DeployEvent {
        let env = run.environment();
        let commit = commit_from_env(&env, commit_subject);

        let deploy_url =
            resolve(config.deploy_url(), &env).unwrap_or_else(|| derived_deploy_url(run));

        let environment = resolve(config.environment_label(), &env)
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let service = resolve(config.service_alias(), &env).unwrap_or_else(|| {
            format!(
                "{}{}",
                SERVICE_PREFIX,
                env.get("JOB_NAME").map(String::as_str).unwrap_or_default()
            )
        });

        let description = resolve(config.description(), &env)
            .or_else(|| commit.as_ref().and_then(|c| c.message.clone()))
            .unwrap_or_else(|| substitute(DEFAULT_DESCRIPTION, &env));

        DeployEvent {
            dedup_id: Uuid::new_v4(),
            deploy_number: run.number.to_string(),
            deploy_url,
            deployed_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            description,
            environment,
            service,
            deployer: deployer_from_config(config, &env),
            commit,
        }
    }
}

/// Substitute `template` against `env`, treating an empty result as unset.
fn resolve(template: &str, env: &HashMap<String, String>) -> Option<String> {
    if template.is_empty() {
        return None;
    }
    Some(substitute(template, env)).filter(|value| !value.is_empty())
}

fn non_empty(value: Option<&String>) -> Option<&String> {
    value.filter(|v| !v.is_empty())
}

fn derived_deploy_url(run: &CompletedRun) -> String {
    match run.absolute_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => format!(
            "{}{}",
            UNSET_LOCATION_BASE,
            run.url.trim_start_matches('/')
        ),
    }
}

fn deployer_from_config(
    config: &NotificationConfig,
    env: &HashMap<String, String>,
) -> Option<Deployer> {
    let deployer = Deployer {
        id: resolve(config.deployer_id(), env),
        name: resolve(config.deployer_name(), env),
        email: resolve(config.deployer_email(), env),
    };
    if deployer.id.is_none() && deployer.name.is_none() && deployer.email.is_none() {
        return None;
    }
    Some(deployer)
}

fn commit_from_env(env: &HashMap<String, String>, subject: Option<String>) -> Option<Commit> {
    let sha = non_empty(env.get("GIT_COMMIT"))?;
    Some(Commit {
        sha: sha.clone(),
        branch: non_empty(env.get("GIT_BRANCH")).cloned(),
        message: subject.filter(|s| !s.is_empty()),
    })
}

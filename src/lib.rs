//! OpsLevel deploy notifications for finished CI builds.
//!
//! A run that finishes successfully is checked against the job and global
//! settings, turned into a deploy event, and POSTed to the OpsLevel webhook.

pub mod api;
pub mod config;
pub mod console;
pub mod db;
pub mod delivery;
pub mod error;
pub mod git;
pub mod logging;
pub mod notifier;
pub mod payload;
pub mod run;
pub mod substitute;
pub mod suppression;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use notifier::Notifier;

pub struct AppState {
    pub notifier: Notifier,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;

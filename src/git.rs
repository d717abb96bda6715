//! Commit metadata read from the build workspace.

use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Upper bound for a single `git` invocation
pub const GIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Subject line of the commit checked out in `workspace`.
///
/// Spawn failures, non-zero exits, timeouts and empty output all yield `None`.
pub async fn commit_subject(workspace: &Path) -> Option<String> {
    let mut command = Command::new("git");
    command
        .current_dir(workspace)
        .args(["show", "-s", "--pretty=%s"])
        .kill_on_drop(true);

    debug!("Running (cwd = {:?}): git show -s --pretty=%s", workspace);
    let output = match timeout(GIT_TIMEOUT, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("git show failed to start in {:?}: {}", workspace, e);
            return None;
        }
        Err(_) => {
            warn!(
                "git show timed out after {:?} in {:?}",
                GIT_TIMEOUT, workspace
            );
            return None;
        }
    };

    if !output.status.success() {
        warn!(
            "Failed to execute command: git show --pretty=%s. Exit code: {:?}. Stderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    first_line(&String::from_utf8_lossy(&output.stdout))
}

fn first_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .next()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

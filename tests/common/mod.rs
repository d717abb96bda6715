//! Shared fixtures: an in-process stand-in for the OpsLevel deploy webhook and
//! a notifier wired to temporary storage.

#![allow(dead_code)]

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header::CONTENT_TYPE},
};
use opslevel_notify::config::{GlobalConfigStore, NotificationConfig};
use opslevel_notify::db::{SqlMarkerStore, init_db};
use opslevel_notify::delivery::WebhookClient;
use opslevel_notify::notifier::Notifier;
use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// A request received by [`MockOpsLevel`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path plus query, e.g. `/?agent=jenkins-0.1.0`
    pub target: String,
    pub content_type: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: &'static str,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockOpsLevel {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockOpsLevel {
    /// Answer every request with `status` and `body`.
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status,
            body,
            requests: requests.clone(),
        };
        let app = Router::new().fallback(record).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    pub async fn ok() -> Self {
        Self::start(StatusCode::OK, r#"{"result": "ok"}"#).await
    }

    /// Root URL, as a user would paste it into the settings
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn only_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().unwrap()
    }
}

async fn record(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        target,
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    (state.status, state.body)
}

/// Address nothing is listening on
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

/// Notifier backed by a temporary marker database and settings file
pub async fn notifier(dir: &Path, global: NotificationConfig) -> Notifier {
    let pool = init_db(dir.join("markers.db")).await.unwrap();
    let store = GlobalConfigStore::with_config(dir.join("opslevel.toml"), global);
    Notifier::new(
        Arc::new(store),
        SqlMarkerStore::new(pool),
        WebhookClient::default(),
    )
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Create a repository in `dir` whose HEAD commit has `subject`, returning its sha.
pub fn git_repo_with_commit(dir: &Path, subject: &str) -> String {
    let git = |args: &[&str]| {
        let output = Command::new("git")
            .current_dir(dir)
            .args([
                "-c",
                "user.name=Test",
                "-c",
                "user.email=test@example.org",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    };

    git(&["init", "-q"]);
    git(&["commit", "-q", "--allow-empty", "-m", subject]);
    git(&["rev-parse", "HEAD"])
}

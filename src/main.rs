use opslevel_notify::config::GlobalConfigStore;
use opslevel_notify::db::{SqlMarkerStore, init_db};
use opslevel_notify::delivery::{DEFAULT_TIMEOUT_SECS, WebhookClient};
use opslevel_notify::error::NotifyError;
use opslevel_notify::logging::{FileLogger, setup_logging};
use opslevel_notify::notifier::Notifier;
use opslevel_notify::{AppState, api};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_CONFIG_PATH: &str = "opslevel.toml";
const DEFAULT_DB_PATH: &str = "data/opslevel.db";

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn delivery_timeout() -> Result<Duration, NotifyError> {
    match std::env::var("OPSLEVEL_TIMEOUT_SECS") {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                NotifyError::ConfigError(format!("Invalid OPSLEVEL_TIMEOUT_SECS '{}': {}", raw, e))
            }),
        Err(_) => Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
    }
}

async fn run() -> Result<(), NotifyError> {
    let bind_address = env_or("BIND_ADDRESS", DEFAULT_BIND_ADDRESS);
    let config_path = env_or("OPSLEVEL_CONFIG", DEFAULT_CONFIG_PATH);
    let db_path = env_or("OPSLEVEL_DB", DEFAULT_DB_PATH);

    let file_logger = std::env::var("OPSLEVEL_LOG_DIR")
        .ok()
        .map(|dir| FileLogger::new(PathBuf::from(dir)));
    let _guard = setup_logging(file_logger.as_ref())?;

    let global = GlobalConfigStore::load(&config_path).await?;
    let pool = init_db(&db_path).await?;
    let notifier = Notifier::new(
        Arc::new(global),
        SqlMarkerStore::new(pool),
        WebhookClient::new(delivery_timeout()?),
    );
    let state = Arc::new(AppState::new(notifier));

    let app = api::router(state);

    info!("Listening on {}", bind_address);
    info!("Using global config at {:?}", config_path);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    if let Err(e) = run().await {
        eprintln!("opslevel_notify: {}", e);
        std::process::exit(1);
    }
}

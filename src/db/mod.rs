use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

pub mod store;

use crate::error::NotifyError;
pub use store::{SqlMarkerStore, SuppressionMarker};

/// Open (creating if needed) the marker database and run migrations
pub async fn init_db(db_path: impl AsRef<Path>) -> Result<SqlitePool, NotifyError> {
    let db_path = db_path.as_ref();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                NotifyError::DatabaseError(format!("Failed to create database directory: {}", e))
            })?;
        }
    }

    info!("Opening marker database at {:?}", db_path);
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| NotifyError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| NotifyError::DatabaseError(format!("Failed to run migrations: {}", e)))?;

    info!("Marker database ready");
    Ok(pool)
}

use std::io;

/// Errors raised while resolving, building or delivering an OpsLevel notification
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Webhook URL is invalid: {url} ({reason})")]
    InvalidWebhookUrl { url: String, reason: String },

    #[error("Webhook request failed: {0}")]
    Delivery(#[from] reqwest::Error),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed webhook response: {0}")]
    MalformedResponse(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// Helper type for Results that use NotifyError
pub type Result<T> = std::result::Result<T, NotifyError>;

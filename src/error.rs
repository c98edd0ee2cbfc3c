use thiserror::Error;

/// Main error type for the swarm generator
#[derive(Error, Debug)]
pub enum StampedeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API call {method} {path} failed: status={status} body={body}")]
    Api {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    // Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("No cached token for account: {0}")]
    TokenMissing(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for StampedeError
pub type Result<T> = std::result::Result<T, StampedeError>;

use thiserror::Error;

/// Main error type for the stats client and cache
#[derive(Error, Debug)]
pub enum FrontOfficeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream error: {0}")]
    Upstream(String),

    // Data errors
    #[error("Invalid upstream data: {0}")]
    InvalidData(String),

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

/// Result type alias for FrontOfficeError
pub type Result<T> = std::result::Result<T, FrontOfficeError>;

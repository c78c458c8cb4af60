use thiserror::Error;

/// Errors surfaced to the command layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable configuration; raised before any network call
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-success HTTP response from an upstream API
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Bad caller input (filters, pagination, date bounds)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

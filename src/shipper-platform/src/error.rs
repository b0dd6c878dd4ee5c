//! Error types for platform adapters.

use thiserror::Error;

/// Result type alias for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{platform} API error ({status}): {body}")]
    Api {
        platform: &'static str,
        status: u16,
        body: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid remote URL '{0}'")]
    InvalidRemote(String),

    #[error("Unsupported git host '{0}'. Add a [hosts] entry to the config to set its kind.")]
    UnsupportedHost(String),

    #[error("No API token configured for {host}")]
    MissingToken { host: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("{0}")]
    Unsupported(String),
}

impl PlatformError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PlatformError::Api { status, .. } => Some(*status),
            PlatformError::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

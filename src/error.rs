//! Error types for the chat client.
//!
//! Every variant collapses to the same user-facing message once it reaches
//! the session controller; the distinctions exist for logs.

use std::path::PathBuf;

use thiserror::Error;

/// Static message shown to the user when an exchange fails.
pub const REQUEST_FAILED_MESSAGE: &str = "Failed to get response from backend.";

/// Client error type.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport failed (connect, send, or body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend answered with a non-success status.
    #[error("Backend error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// No rewrite rule matches the requested path.
    #[error("No route for path: {0}")]
    NoRoute(String),

    /// The selected file could not be read.
    #[error("Cannot read attachment {}: {source}", path.display())]
    Attachment {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configured endpoint cannot carry a file.
    #[error("The {0} endpoint does not accept attachments")]
    AttachmentUnsupported(&'static str),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Common error and result types

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from configuration, the outbound API clients, and the Discord IPC socket
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport or status error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Discord local IPC error
    #[error("Discord IPC error: {0}")]
    Discord(#[from] discord_rich_presence::error::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Plex account authentication failure
    #[error("Plex authentication failed: {0}")]
    PlexAuth(String),

    /// None of the configured Plex servers could be located or reached
    #[error("Plex server unavailable: {0}")]
    ServerNotFound(String),
}

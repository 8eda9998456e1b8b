//! Error types for bsync-client

use thiserror::Error;

/// Main error type for bsync-client
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure talking to the server
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Event payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request needs a connection id and none has been issued yet
    #[error("Not connected to a room")]
    NotConnected,

    /// Event stream or mirror channel ended
    #[error("Stream closed")]
    Closed,

    /// Shared library errors (configuration)
    #[error(transparent)]
    Common(#[from] bsync_common::Error),
}

/// Convenience Result type using bsync-client Error
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for bsync-server
//!
//! Defines module-specific error types using thiserror for clear error propagation,
//! and maps them onto HTTP responses for the API layer.

use crate::gate::PermissionError;
use crate::store::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bsync_common::{ConnectionId, RoomId};
use serde::Serialize;
use thiserror::Error;

/// Main error type for bsync-server
#[derive(Error, Debug)]
pub enum Error {
    /// Connection lacks the capability for a mutation
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// Proposed change does not fit the queue
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Room task has stopped
    #[error("Room closed: {0}")]
    RoomClosed(RoomId),

    /// No room with this id is running
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// Connection id not joined to the room
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Shared library errors (configuration, encoding)
    #[error(transparent)]
    Common(#[from] bsync_common::Error),
}

/// Convenience Result type using bsync-server Error
pub type Result<T> = std::result::Result<T, Error>;

/// JSON body returned with every error status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub code: &'static str,
    pub message: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Permission(_) => StatusCode::FORBIDDEN,
            Error::Validation(ValidationError::UnknownEntry(_)) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::CONFLICT,
            Error::RoomClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::RoomNotFound(_) | Error::ConnectionNotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Http(_) | Error::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::Permission(_) => "permission-denied",
            Error::Validation(e) => e.code(),
            Error::RoomClosed(_) => "room-closed",
            Error::RoomNotFound(_) => "room-not-found",
            Error::ConnectionNotFound(_) => "connection-not-found",
            Error::BadRequest(_) => "bad-request",
            Error::Http(_) | Error::Common(_) => "internal",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = StatusResponse {
            status: "error".to_string(),
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

//! Wire protocol between room participants and the room server
//!
//! JSON messages tagged by `type` (SCREAMING_SNAKE_CASE) with camelCase fields.
//! Every mutating request may carry a `requestId`; the server echoes it on the
//! `QUEUE_SET` it causes, or on the `REQUEST_REJECTED` sent back to the requester.

use crate::entry::{EntryUrl, QueueEntry, QueueEntryState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Logical room name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Server-assigned identity of one joined participant stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ConnectionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Client-chosen correlation id for a mutating request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Participant role within a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Member => f.write_str("member"),
        }
    }
}

// ========================================
// Client -> Server
// ========================================

/// Requests a participant can send to its room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClientRequest {
    /// Full proposed ordering of the current queue
    ReorderQueue {
        reordered_entries: Vec<QueueEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },

    /// Remove entries by url
    DeleteEntries {
        urls: Vec<EntryUrl>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },

    /// Append entries (they start in `loading` state)
    AddEntries {
        urls: Vec<EntryUrl>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
}

impl ClientRequest {
    /// Build a reorder request from an ordered url list
    pub fn reorder<I>(urls: I, request_id: Option<RequestId>) -> Self
    where
        I: IntoIterator<Item = EntryUrl>,
    {
        ClientRequest::ReorderQueue {
            reordered_entries: urls.into_iter().map(|url| QueueEntry { url }).collect(),
            request_id,
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            ClientRequest::ReorderQueue { request_id, .. }
            | ClientRequest::DeleteEntries { request_id, .. }
            | ClientRequest::AddEntries { request_id, .. } => *request_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientRequest::ReorderQueue { .. } => "REORDER_QUEUE",
            ClientRequest::DeleteEntries { .. } => "DELETE_ENTRIES",
            ClientRequest::AddEntries { .. } => "ADD_ENTRIES",
        }
    }
}

// ========================================
// Server -> Client
// ========================================

/// Why a request was refused after authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectCode {
    UnknownEntry,
    MissingEntry,
    DuplicateEntry,
}

impl RejectCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectCode::UnknownEntry => "unknown-entry",
            RejectCode::MissingEntry => "missing-entry",
            RejectCode::DuplicateEntry => "duplicate-entry",
        }
    }
}

impl fmt::Display for RejectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectReason {
    pub code: RejectCode,
    pub url: EntryUrl,
}

/// Messages pushed from the room to a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// First message on every participant stream
    Connected {
        connection_id: ConnectionId,
        room_id: RoomId,
        role: Role,
        can_mutate: bool,
    },

    /// Canonical queue order (full contents)
    QueueSet {
        entries: Vec<QueueEntryState>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
        timestamp: DateTime<Utc>,
    },

    /// A request from this participant was refused; sent to the requester only
    RequestRejected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
        reason: RejectReason,
        timestamp: DateTime<Utc>,
    },
}

impl ServerMessage {
    pub fn queue_set(entries: Vec<QueueEntryState>, request_id: Option<RequestId>) -> Self {
        ServerMessage::QueueSet {
            entries,
            request_id,
            timestamp: Utc::now(),
        }
    }

    /// Message type name, also used as the SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Connected { .. } => "CONNECTED",
            ServerMessage::QueueSet { .. } => "QUEUE_SET",
            ServerMessage::RequestRejected { .. } => "REQUEST_REJECTED",
        }
    }
}

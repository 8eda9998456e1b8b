//! Session
//!
//! The broadcast-receiving layer: applies server messages to the mirror and
//! settles the optimistic preview. This is the only holder of the
//! [`MirrorWriter`].

use crate::error::Result;
use crate::mirror::{ClientMirror, MirrorWriter};
use crate::preview::{OptimisticPreview, PreviewResolution};
use crate::transport::{EventStream, HttpTransport};
use bsync_common::protocol::RejectReason;
use bsync_common::{ConnectionId, Role, ServerMessage};
use std::time::Instant;
use tracing::{debug, info, warn};

/// What one server message (or a preview timeout) changed
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Connected {
        connection_id: ConnectionId,
        role: Role,
        can_mutate: bool,
    },
    QueueSet {
        entries: usize,
        preview: Option<PreviewResolution>,
    },
    Rejected {
        reason: RejectReason,
        preview: Option<PreviewResolution>,
    },
    PreviewExpired,
}

pub struct Session {
    writer: MirrorWriter,
    preview: OptimisticPreview,
    connection_id: Option<ConnectionId>,
}

impl Session {
    pub fn new(writer: MirrorWriter, preview: OptimisticPreview) -> Self {
        Self {
            writer,
            preview,
            connection_id: None,
        }
    }

    pub fn mirror(&self) -> ClientMirror {
        self.writer.reader()
    }

    pub fn preview(&self) -> &OptimisticPreview {
        &self.preview
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id
    }

    pub fn apply(&mut self, message: ServerMessage) -> SessionUpdate {
        match message {
            ServerMessage::Connected {
                connection_id,
                room_id,
                role,
                can_mutate,
            } => {
                info!(room_id = %room_id, connection = %connection_id, role = %role, can_mutate, "Connected");
                self.connection_id = Some(connection_id);
                self.writer.set_capability(role, can_mutate);
                SessionUpdate::Connected {
                    connection_id,
                    role,
                    can_mutate,
                }
            }
            ServerMessage::QueueSet {
                entries,
                request_id,
                ..
            } => {
                let count = entries.len();
                self.writer.replace_all(entries);
                let preview = self.preview.on_queue_set(request_id);
                debug!(entries = count, ?preview, "Queue replaced");
                SessionUpdate::QueueSet {
                    entries: count,
                    preview,
                }
            }
            ServerMessage::RequestRejected {
                request_id, reason, ..
            } => {
                let preview = self.preview.on_rejected(request_id);
                warn!(code = %reason.code, url = %reason.url, "Request rejected");
                SessionUpdate::Rejected { reason, preview }
            }
        }
    }

    /// Wait for the next server message or preview timeout
    ///
    /// `None` once the server closes the stream. A `CONNECTED` message also
    /// hands the connection id to `transport` for later requests.
    pub async fn next_update(
        &mut self,
        events: &mut EventStream,
        transport: &HttpTransport,
    ) -> Result<Option<SessionUpdate>> {
        loop {
            let deadline = self.preview.deadline();
            tokio::select! {
                message = events.next_message() => {
                    let Some(message) = message? else {
                        return Ok(None);
                    };
                    let update = self.apply(message);
                    if let SessionUpdate::Connected { connection_id, .. } = &update {
                        transport.set_connection_id(*connection_id);
                    }
                    return Ok(Some(update));
                }
                _ = preview_deadline(deadline) => {
                    if self.preview.expire(Instant::now()).is_some() {
                        return Ok(Some(SessionUpdate::PreviewExpired));
                    }
                }
            }
        }
    }
}

async fn preview_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

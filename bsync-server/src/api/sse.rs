//! Participant event stream (SSE)
//!
//! Opening the stream joins the room; the stream carries `CONNECTED`, the queue
//! snapshot and every later message for this participant. Dropping the stream
//! leaves the room.

use super::AppContext;
use crate::error::Result;
use crate::room::LeaveGuard;
use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use bsync_common::RoomId;
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    client_name: Option<String>,
}

/// GET /api/rooms/:room_id/events
pub async fn event_stream(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let room_id = RoomId::new(room_id);
    let (room, joined) = ctx.registry.join(&room_id, query.client_name).await?;

    let connection_id = joined.connection.id;
    info!(room_id = %room_id, connection = %connection_id, "SSE client connected");

    let guard = LeaveGuard::new(room, connection_id);
    let mut messages = joined.messages;

    let stream = async_stream::stream! {
        let _guard = guard;

        while let Some(message) = messages.recv().await {
            match serde_json::to_string(&*message) {
                Ok(json) => {
                    debug!(connection = %connection_id, "Sending SSE event: {}", message.kind());
                    yield Ok::<Event, Infallible>(Event::default().event(message.kind()).data(json));
                }
                Err(e) => warn!("Failed to serialize {}: {}", message.kind(), e),
            }
        }

        // Room closed our queue: evicted, or the room stopped
        debug!(connection = %connection_id, "SSE stream ended");
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

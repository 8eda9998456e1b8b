//! HTTP request handlers
//!
//! Handlers never hold room state: they resolve a room handle, send it one
//! command and translate the reply.

use super::{AppContext, CONNECTION_ID_HEADER};
use crate::error::{Error, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use bsync_common::{ClientRequest, ConnectionId, QueueEntryState, RoomId};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    room_id: RoomId,
    entries: Vec<QueueEntryState>,
}

#[derive(Debug, Serialize)]
pub struct StatusReportResponse {
    changed: bool,
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "bsync-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Room Endpoints
// ============================================================================

/// POST /api/rooms/:room_id/messages - Submit a participant request
///
/// Answers `202 Accepted` once the request passed the permission gate. The
/// outcome arrives on the participant's stream as `QUEUE_SET` (to everyone)
/// or `REQUEST_REJECTED` (to the requester).
pub async fn post_message(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ClientRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let room_id = RoomId::new(room_id);
    let connection_id = connection_id(&headers)?;
    let Json(request) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;

    debug!(room_id = %room_id, connection = %connection_id, kind = request.kind(), "Request received");

    let room = ctx.registry.existing(&room_id)?;
    room.submit(connection_id, request).await?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/rooms/:room_id/queue - Current canonical order
pub async fn get_queue(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
) -> Result<Json<QueueResponse>> {
    let room_id = RoomId::new(room_id);
    let entries = ctx.registry.existing(&room_id)?.snapshot().await?;
    Ok(Json(QueueResponse { room_id, entries }))
}

/// POST /api/rooms/:room_id/entries/status - Load result from ingestion
pub async fn report_status(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
    payload: std::result::Result<Json<QueueEntryState>, JsonRejection>,
) -> Result<Json<StatusReportResponse>> {
    let room_id = RoomId::new(room_id);
    let Json(report) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;

    let room = ctx.registry.existing(&room_id)?;
    let changed = room.report_status(report.url.clone(), report.status.clone()).await?;
    if changed {
        info!(room_id = %room_id, url = %report.url, status = %report.status, "Entry status reported");
    }
    Ok(Json(StatusReportResponse { changed }))
}

fn connection_id(headers: &HeaderMap) -> Result<ConnectionId> {
    let value = headers
        .get(CONNECTION_ID_HEADER)
        .ok_or_else(|| Error::BadRequest(format!("missing {} header", CONNECTION_ID_HEADER)))?;
    value
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .map(ConnectionId::from)
        .ok_or_else(|| Error::BadRequest(format!("invalid {} header", CONNECTION_ID_HEADER)))
}

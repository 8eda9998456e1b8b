//! Integration tests for bsync-server API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Request submission status codes (202 / 400 / 403 / 404)
//! - Queue inspection
//! - Ingestion status reports
//! - SSE join preamble

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use bsync_common::config::{ControlPolicy, RoomsConfig};
use bsync_common::{ClientRequest, EntryUrl, RoomId};
use bsync_server::api::{build_router, AppContext, CONNECTION_ID_HEADER};
use bsync_server::{Joined, RoomRegistry};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: registry plus router sharing it
fn setup_app(policy: ControlPolicy) -> (Arc<RoomRegistry>, axum::Router) {
    let registry = Arc::new(RoomRegistry::from_config(&RoomsConfig {
        control_policy: policy,
        ..RoomsConfig::default()
    }));
    let app = build_router(AppContext::new(Arc::clone(&registry)));
    (registry, app)
}

fn post_json(uri: &str, connection: Option<&Joined>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(joined) = connection {
        builder = builder.header(CONNECTION_ID_HEADER, joined.connection.id.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn join(registry: &RoomRegistry, room: &str) -> Joined {
    let (_, joined) = registry.join(&RoomId::from(room), None).await.unwrap();
    joined
}

async fn seed(registry: &RoomRegistry, room: &str, admin: &Joined, urls: &[&str]) {
    registry
        .existing(&RoomId::from(room))
        .unwrap()
        .submit(
            admin.connection.id,
            ClientRequest::AddEntries {
                urls: urls.iter().map(|u| EntryUrl::from(*u)).collect(),
                request_id: None,
            },
        )
        .await
        .unwrap();
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_, app) = setup_app(ControlPolicy::AdminOnly);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "bsync-server");
    assert!(body["version"].is_string());
}

// =============================================================================
// Message Submission
// =============================================================================

#[tokio::test]
async fn test_admin_reorder_accepted() {
    let (registry, app) = setup_app(ControlPolicy::AdminOnly);
    let admin = join(&registry, "lobby").await;
    seed(&registry, "lobby", &admin, &["a", "b", "c"]).await;

    let request = post_json(
        "/api/rooms/lobby/messages",
        Some(&admin),
        json!({
            "type": "REORDER_QUEUE",
            "reorderedEntries": [{"url": "c"}, {"url": "a"}, {"url": "b"}],
            "requestId": "6f9619ff-8b86-d011-b42d-00cf4fc964ff"
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app.oneshot(get("/api/rooms/lobby/queue")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["roomId"], "lobby");
    let urls: Vec<&str> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["url"].as_str().unwrap())
        .collect();
    assert_eq!(urls, ["c", "a", "b"]);
    assert_eq!(body["entries"][0]["status"], "loading");
}

#[tokio::test]
async fn test_member_reorder_forbidden() {
    let (registry, app) = setup_app(ControlPolicy::AdminOnly);
    let admin = join(&registry, "lobby").await;
    let member = join(&registry, "lobby").await;
    seed(&registry, "lobby", &admin, &["a", "b"]).await;

    let request = post_json(
        "/api/rooms/lobby/messages",
        Some(&member),
        json!({"type": "REORDER_QUEUE", "reorderedEntries": [{"url": "b"}, {"url": "a"}]}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "permission-denied");

    let body = extract_json(
        app.oneshot(get("/api/rooms/lobby/queue"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(body["entries"][0]["url"], "a");
}

#[tokio::test]
async fn test_invalid_reorder_still_accepted() {
    // Validation happens after authorization; the outcome goes to the stream
    let (registry, app) = setup_app(ControlPolicy::AdminOnly);
    let admin = join(&registry, "lobby").await;
    seed(&registry, "lobby", &admin, &["a", "b"]).await;

    let request = post_json(
        "/api/rooms/lobby/messages",
        Some(&admin),
        json!({"type": "REORDER_QUEUE", "reorderedEntries": [{"url": "a"}]}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_unknown_room_and_connection() {
    let (registry, app) = setup_app(ControlPolicy::Everyone);

    let stranger = join(&registry, "elsewhere").await;
    let request = post_json(
        "/api/rooms/nowhere/messages",
        Some(&stranger),
        json!({"type": "ADD_ENTRIES", "urls": ["x"]}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(extract_json(response.into_body()).await["code"], "room-not-found");

    // Connection belongs to another room
    let _host = join(&registry, "lobby").await;
    let request = post_json(
        "/api/rooms/lobby/messages",
        Some(&stranger),
        json!({"type": "ADD_ENTRIES", "urls": ["x"]}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        extract_json(response.into_body()).await["code"],
        "connection-not-found"
    );
}

#[tokio::test]
async fn test_bad_requests() {
    let (registry, app) = setup_app(ControlPolicy::Everyone);
    let admin = join(&registry, "lobby").await;

    // Missing connection header
    let request = post_json(
        "/api/rooms/lobby/messages",
        None,
        json!({"type": "ADD_ENTRIES", "urls": ["x"]}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown message type
    let request = post_json(
        "/api/rooms/lobby/messages",
        Some(&admin),
        json!({"type": "SHUFFLE"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(extract_json(response.into_body()).await["code"], "bad-request");
}

// =============================================================================
// Status Reports
// =============================================================================

#[tokio::test]
async fn test_status_report() {
    let (registry, app) = setup_app(ControlPolicy::AdminOnly);
    let admin = join(&registry, "lobby").await;
    seed(&registry, "lobby", &admin, &["a"]).await;

    let request = post_json(
        "/api/rooms/lobby/entries/status",
        None,
        json!({"url": "a", "status": "error", "error": "decode failed"}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["changed"], true);

    let body = extract_json(
        app.clone()
            .oneshot(get("/api/rooms/lobby/queue"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(body["entries"][0]["status"], "error");
    assert_eq!(body["entries"][0]["error"], "decode failed");

    let request = post_json(
        "/api/rooms/lobby/entries/status",
        None,
        json!({"url": "missing", "status": "loaded"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(extract_json(response.into_body()).await["code"], "unknown-entry");
}

// =============================================================================
// SSE
// =============================================================================

#[tokio::test]
async fn test_event_stream_starts_with_connected() {
    let (_, app) = setup_app(ControlPolicy::AdminOnly);

    let response = app
        .oneshot(get("/api/rooms/lobby/events?clientName=tester"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: CONNECTED"), "got {:?}", text);
    assert!(text.contains("\"role\":\"admin\""), "got {:?}", text);
}

#[tokio::test]
async fn test_event_stream_rejects_bad_room_id() {
    let (_, app) = setup_app(ControlPolicy::AdminOnly);
    let response = app
        .oneshot(get("/api/rooms/bad%20room/events"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

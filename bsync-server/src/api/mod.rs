//! HTTP API for bsync-server
//!
//! Participants receive room messages over SSE and submit requests with POST.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, run, serve, AppContext};

/// Header carrying the connection id issued in the `CONNECTED` message
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";

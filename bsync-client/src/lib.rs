//! # bsync-client
//!
//! Client side of the shared room queue:
//! - [`mirror`]: local copy of the canonical order, written only by broadcasts
//! - [`drag`]: gesture-to-reorder controller with activation constraints
//! - [`preview`]: optimistic preview with correlation id and timeout
//! - [`order`]: array move
//! - [`session`]: applies server messages to mirror and preview
//! - [`transport`] / [`sse`]: HTTP requests and SSE decoding

pub mod config;
pub mod drag;
pub mod error;
pub mod mirror;
pub mod order;
pub mod preview;
pub mod session;
pub mod sse;
pub mod transport;

pub use config::ClientConfig;
pub use drag::{DragOutcome, DragReorderController, RequestSink};
pub use error::{Error, Result};
pub use mirror::{mirror, ClientMirror, MirrorWriter};
pub use preview::OptimisticPreview;
pub use session::{Session, SessionUpdate};
pub use transport::HttpTransport;

//! # bsync-server
//!
//! Shared room queue server. Each room keeps one authoritative queue order that
//! participants reorder, extend and trim; every accepted change is broadcast to
//! all participants as a full snapshot.
//!
//! - [`store`]: canonical order and permutation validation
//! - [`gate`]: per-connection mutation capability
//! - [`fanout`]: per-participant bounded delivery
//! - [`room`]: single-task room actor tying the above together
//! - [`registry`]: room lookup and lifecycle
//! - [`api`]: HTTP + SSE surface

pub mod api;
pub mod error;
pub mod fanout;
pub mod gate;
pub mod registry;
pub mod room;
pub mod store;

pub use error::{Error, Result};
pub use registry::RoomRegistry;
pub use room::{Joined, RoomHandle, RoomSettings};

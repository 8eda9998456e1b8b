//! # bsync Common Library
//!
//! Shared code for the bsync room server and client:
//! - Queue entry types (url identity + load status)
//! - Wire protocol (client requests, server messages)
//! - Configuration loading and resolution
//! - Common error type

pub mod config;
pub mod entry;
pub mod error;
pub mod protocol;

pub use entry::{EntryStatus, EntryUrl, QueueEntry, QueueEntryState};
pub use error::{Error, Result};
pub use protocol::{ClientRequest, ConnectionId, RequestId, Role, RoomId, ServerMessage};

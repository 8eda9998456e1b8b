//! Client mirror
//!
//! Local copy of the room's canonical order and this connection's capability.
//! Only the [`MirrorWriter`] held by the session can change it, and only with
//! whole snapshots from the server. Everything else reads through a cloneable
//! [`ClientMirror`] and waits on `changed()` for updates.

use crate::error::{Error, Result};
use bsync_common::{EntryUrl, QueueEntryState, Role};
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorState {
    pub entries: Vec<QueueEntryState>,
    pub role: Option<Role>,
    pub can_mutate: bool,
    /// Bumped on every write
    pub version: u64,
}

impl MirrorState {
    pub fn urls(&self) -> Vec<EntryUrl> {
        self.entries.iter().map(|e| e.url.clone()).collect()
    }

    pub fn position(&self, url: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.url.as_str() == url)
    }
}

/// Create a mirror and its single write handle
pub fn mirror() -> (MirrorWriter, ClientMirror) {
    let (tx, rx) = watch::channel(MirrorState::default());
    (MirrorWriter { tx }, ClientMirror { rx })
}

/// Sole write path into the mirror
#[derive(Debug)]
pub struct MirrorWriter {
    tx: watch::Sender<MirrorState>,
}

impl MirrorWriter {
    /// Replace the whole order with a canonical snapshot
    pub fn replace_all(&self, entries: Vec<QueueEntryState>) {
        self.tx.send_modify(|state| {
            state.entries = entries;
            state.version += 1;
        });
    }

    pub fn set_capability(&self, role: Role, can_mutate: bool) {
        self.tx.send_modify(|state| {
            state.role = Some(role);
            state.can_mutate = can_mutate;
            state.version += 1;
        });
    }

    pub fn reader(&self) -> ClientMirror {
        ClientMirror {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read handle on the mirror
#[derive(Debug, Clone)]
pub struct ClientMirror {
    rx: watch::Receiver<MirrorState>,
}

impl ClientMirror {
    pub fn current_order(&self) -> Vec<QueueEntryState> {
        self.rx.borrow().entries.clone()
    }

    pub fn capability(&self) -> bool {
        self.rx.borrow().can_mutate
    }

    pub fn role(&self) -> Option<Role> {
        self.rx.borrow().role
    }

    pub fn version(&self) -> u64 {
        self.rx.borrow().version
    }

    pub fn snapshot(&self) -> MirrorState {
        self.rx.borrow().clone()
    }

    /// Wait for the next write; `Err(Closed)` once the writer is gone
    pub async fn changed(&mut self) -> Result<MirrorState> {
        self.rx.changed().await.map_err(|_| Error::Closed)?;
        Ok(self.rx.borrow_and_update().clone())
    }
}

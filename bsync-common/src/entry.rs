//! Queue entry types
//!
//! An entry is identified by its url, never by its position. Load status is owned by the
//! ingestion side and travels with the entry unchanged through any reorder.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable identifier of a queue entry within a room
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryUrl(String);

impl EntryUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, used for display when no title is known
    pub fn file_name(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for EntryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryUrl {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntryUrl {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for EntryUrl {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EntryUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Bare entry reference, as carried by reorder requests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueEntry {
    pub url: EntryUrl,
}

impl QueueEntry {
    pub fn new(url: impl Into<EntryUrl>) -> Self {
        Self { url: url.into() }
    }
}

/// Load status of an entry
///
/// Transitions: `Loading -> Loaded` and `Loading -> Error`. Reordering never touches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntryStatus {
    Loading,
    Loaded,
    Error { error: String },
}

impl EntryStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, EntryStatus::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EntryStatus::Error { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            EntryStatus::Error { error } => Some(error),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal status transition
    pub fn can_transition_to(&self, next: &EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Loading, EntryStatus::Loaded) | (EntryStatus::Loading, EntryStatus::Error { .. })
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryStatus::Loading => "loading",
            EntryStatus::Loaded => "loaded",
            EntryStatus::Error { .. } => "error",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Error { error } => write!(f, "error ({})", error),
            other => f.write_str(other.label()),
        }
    }
}

/// Entry as held in a room queue and rendered by clients
///
/// Wire form is flat: `{"url": "...", "status": "error", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntryState {
    pub url: EntryUrl,
    #[serde(flatten)]
    pub status: EntryStatus,
}

impl QueueEntryState {
    pub fn loading(url: impl Into<EntryUrl>) -> Self {
        Self {
            url: url.into(),
            status: EntryStatus::Loading,
        }
    }

    pub fn loaded(url: impl Into<EntryUrl>) -> Self {
        Self {
            url: url.into(),
            status: EntryStatus::Loaded,
        }
    }

    pub fn entry(&self) -> QueueEntry {
        QueueEntry {
            url: self.url.clone(),
        }
    }
}

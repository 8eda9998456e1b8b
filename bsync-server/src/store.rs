//! Canonical queue store for one room
//!
//! Pure state and validation, no I/O. Identity is the entry url: the store keeps an
//! explicit order list plus a url -> status map, and every mutation validates fully
//! before it touches either, so a failed call leaves the queue exactly as it was.

use bsync_common::protocol::{RejectCode, RejectReason};
use bsync_common::{EntryStatus, EntryUrl, QueueEntryState};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A proposed mutation does not fit the current queue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Proposal names a url that is not queued
    #[error("unknown-entry: {0}")]
    UnknownEntry(EntryUrl),

    /// Proposal leaves out a url that is queued
    #[error("missing-entry: {0}")]
    MissingEntry(EntryUrl),

    /// Proposal names the same url twice, or adds one that is already queued
    #[error("duplicate-entry: {0}")]
    DuplicateEntry(EntryUrl),

    /// Status report outside `loading -> loaded | error`
    #[error("invalid status transition for {url}: {from} -> {to}")]
    InvalidTransition {
        url: EntryUrl,
        from: &'static str,
        to: &'static str,
    },
}

impl ValidationError {
    /// Stable wire code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::UnknownEntry(_) => "unknown-entry",
            ValidationError::MissingEntry(_) => "missing-entry",
            ValidationError::DuplicateEntry(_) => "duplicate-entry",
            ValidationError::InvalidTransition { .. } => "invalid-transition",
        }
    }

    /// Rejection payload for the requesting participant, if this error can come from a request
    pub fn reject_reason(&self) -> Option<RejectReason> {
        let (code, url) = match self {
            ValidationError::UnknownEntry(url) => (RejectCode::UnknownEntry, url),
            ValidationError::MissingEntry(url) => (RejectCode::MissingEntry, url),
            ValidationError::DuplicateEntry(url) => (RejectCode::DuplicateEntry, url),
            ValidationError::InvalidTransition { .. } => return None,
        };
        Some(RejectReason {
            code,
            url: url.clone(),
        })
    }
}

/// Ordered, duplicate-free collection of entries
#[derive(Debug, Clone, Default)]
pub struct QueueStore {
    order: Vec<EntryUrl>,
    statuses: HashMap<EntryUrl, EntryStatus>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical order with each entry's current status
    pub fn current_order(&self) -> Vec<QueueEntryState> {
        self.order
            .iter()
            .map(|url| QueueEntryState {
                url: url.clone(),
                status: self
                    .statuses
                    .get(url)
                    .cloned()
                    .unwrap_or(EntryStatus::Loading),
            })
            .collect()
    }

    pub fn urls(&self) -> &[EntryUrl] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.statuses.contains_key(url)
    }

    pub fn status(&self, url: &str) -> Option<&EntryStatus> {
        self.statuses.get(url)
    }

    /// Replace the order with `proposed` if it is a permutation of the current urls
    ///
    /// Statuses are keyed by url and stay with their entries.
    pub fn apply_reorder(&mut self, proposed: &[EntryUrl]) -> Result<(), ValidationError> {
        self.check_permutation(proposed)?;
        self.order = proposed.to_vec();
        Ok(())
    }

    /// Scan in proposal order: the first unknown or repeated url wins; a clean scan
    /// that still falls short reports the first queued url not proposed.
    fn check_permutation(&self, proposed: &[EntryUrl]) -> Result<(), ValidationError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(proposed.len());
        for url in proposed {
            if !self.statuses.contains_key(url.as_str()) {
                return Err(ValidationError::UnknownEntry(url.clone()));
            }
            if !seen.insert(url.as_str()) {
                return Err(ValidationError::DuplicateEntry(url.clone()));
            }
        }

        if seen.len() != self.order.len() {
            if let Some(missing) = self.order.iter().find(|url| !seen.contains(url.as_str())) {
                return Err(ValidationError::MissingEntry(missing.clone()));
            }
        }
        Ok(())
    }

    /// Append one new entry in `loading` state
    pub fn append(&mut self, url: EntryUrl) -> Result<(), ValidationError> {
        self.append_all(std::slice::from_ref(&url))
    }

    /// Append several entries; all or nothing
    pub fn append_all(&mut self, urls: &[EntryUrl]) -> Result<(), ValidationError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(urls.len());
        for url in urls {
            if self.statuses.contains_key(url.as_str()) || !seen.insert(url.as_str()) {
                return Err(ValidationError::DuplicateEntry(url.clone()));
            }
        }

        for url in urls {
            self.statuses.insert(url.clone(), EntryStatus::Loading);
            self.order.push(url.clone());
        }
        Ok(())
    }

    /// Record a load result for an entry
    ///
    /// Returns `Ok(false)` when the entry already has exactly this status.
    pub fn set_status(&mut self, url: &str, status: EntryStatus) -> Result<bool, ValidationError> {
        let current = self
            .statuses
            .get_mut(url)
            .ok_or_else(|| ValidationError::UnknownEntry(EntryUrl::from(url)))?;

        if *current == status {
            return Ok(false);
        }
        if !current.can_transition_to(&status) {
            return Err(ValidationError::InvalidTransition {
                url: EntryUrl::from(url),
                from: current.label(),
                to: status.label(),
            });
        }

        *current = status;
        Ok(true)
    }

    /// Remove every listed url that is queued; unknown urls are ignored
    pub fn remove(&mut self, urls: &[EntryUrl]) -> usize {
        let doomed: HashSet<&str> = urls
            .iter()
            .map(EntryUrl::as_str)
            .filter(|url| self.statuses.contains_key(*url))
            .collect();
        if doomed.is_empty() {
            return 0;
        }

        self.order.retain(|url| !doomed.contains(url.as_str()));
        for url in &doomed {
            self.statuses.remove(*url);
        }
        doomed.len()
    }
}

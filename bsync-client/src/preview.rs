//! Optimistic preview
//!
//! After a drop, the client shows its proposed order right away while the
//! request travels. The preview remembers the request id and a deadline and is
//! dropped when the server answers that id (`QUEUE_SET` or `REQUEST_REJECTED`)
//! or when the deadline passes without an answer. Rendering always goes through
//! [`OptimisticPreview::view`], which falls back to the canonical order whenever
//! the preview no longer covers the same entries.

use bsync_common::{EntryUrl, QueueEntryState, RequestId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingPreview {
    pub request_id: RequestId,
    pub order: Vec<EntryUrl>,
    pub deadline: Instant,
}

/// Why a preview ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewResolution {
    /// Broadcast carrying our request id arrived
    Confirmed,
    /// Server refused the request
    Rejected,
    /// No answer before the deadline
    Expired,
}

/// Shared between the drag controller (records) and the session (resolves)
#[derive(Debug, Clone)]
pub struct OptimisticPreview {
    pending: Arc<Mutex<Option<PendingPreview>>>,
    timeout: Duration,
}

impl OptimisticPreview {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(None)),
            timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingPreview>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Show `order` until the answer to `request_id` arrives; replaces any earlier preview
    pub fn record(&self, request_id: RequestId, order: Vec<EntryUrl>, now: Instant) {
        *self.lock() = Some(PendingPreview {
            request_id,
            order,
            deadline: now + self.timeout,
        });
    }

    pub fn pending(&self) -> Option<PendingPreview> {
        self.lock().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Next deadline, for scheduling `expire`
    pub fn deadline(&self) -> Option<Instant> {
        self.lock().as_ref().map(|p| p.deadline)
    }

    /// A `QUEUE_SET` arrived; broadcasts for other requests leave the preview in place
    pub fn on_queue_set(&self, request_id: Option<RequestId>) -> Option<PreviewResolution> {
        self.resolve_if(request_id, PreviewResolution::Confirmed)
    }

    pub fn on_rejected(&self, request_id: Option<RequestId>) -> Option<PreviewResolution> {
        self.resolve_if(request_id, PreviewResolution::Rejected)
    }

    fn resolve_if(&self, request_id: Option<RequestId>, resolution: PreviewResolution) -> Option<PreviewResolution> {
        let mut pending = self.lock();
        match (pending.as_ref(), request_id) {
            (Some(preview), Some(id)) if preview.request_id == id => {
                debug!(request_id = %id, ?resolution, "Preview resolved");
                *pending = None;
                Some(resolution)
            }
            _ => None,
        }
    }

    /// Revert a preview whose answer is overdue
    pub fn expire(&self, now: Instant) -> Option<PreviewResolution> {
        let mut pending = self.lock();
        match pending.as_ref() {
            Some(preview) if now >= preview.deadline => {
                debug!(request_id = %preview.request_id, "Preview expired, reverting");
                *pending = None;
                Some(PreviewResolution::Expired)
            }
            _ => None,
        }
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Order to render: the preview when it is a permutation of `canonical`, else `canonical`
    ///
    /// Statuses always come from `canonical`.
    pub fn view(&self, canonical: &[QueueEntryState]) -> Vec<QueueEntryState> {
        let pending = self.lock();
        let Some(preview) = pending.as_ref() else {
            return canonical.to_vec();
        };

        if preview.order.len() != canonical.len() {
            return canonical.to_vec();
        }
        let by_url: HashMap<&str, &QueueEntryState> =
            canonical.iter().map(|e| (e.url.as_str(), e)).collect();
        let distinct: HashSet<&str> = preview.order.iter().map(|u| u.as_str()).collect();
        if distinct.len() != preview.order.len() {
            return canonical.to_vec();
        }

        let mut view = Vec::with_capacity(canonical.len());
        for url in &preview.order {
            match by_url.get(url.as_str()) {
                Some(entry) => view.push((*entry).clone()),
                None => return canonical.to_vec(),
            }
        }
        view
    }
}

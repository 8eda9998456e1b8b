//! Broadcast fan-out
//!
//! Each participant owns a bounded outbound queue drained by its SSE stream.
//! Delivery is a non-blocking `try_send` per participant, so a slow or dead
//! participant never delays the others. A participant whose queue is full is
//! evicted rather than skipped: every `QUEUE_SET` is a full snapshot, and a
//! client that silently missed one would stay stale. Eviction ends its stream
//! and the client rejoins with a fresh snapshot.

use bsync_common::{ConnectionId, ServerMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Shared message as queued for each participant
pub type Outbound = Arc<ServerMessage>;

/// Result of delivering to a single participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Queue full or receiver gone; the participant was detached
    Evicted,
    /// No such participant attached
    Unknown,
}

/// Outcome of one broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub evicted: Vec<ConnectionId>,
}

/// Per-room table of participant outbound queues
#[derive(Debug, Default)]
pub struct Fanout {
    outbound: HashMap<ConnectionId, mpsc::Sender<Outbound>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bounded outbound queue for a participant and attach its sender
    pub fn attach(&mut self, id: ConnectionId, capacity: usize) -> mpsc::Receiver<Outbound> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.outbound.insert(id, tx);
        rx
    }

    pub fn detach(&mut self, id: &ConnectionId) -> bool {
        self.outbound.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.outbound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.outbound.contains_key(id)
    }

    /// Deliver to one participant
    pub fn send_to(&mut self, id: &ConnectionId, message: Outbound) -> Delivery {
        let Some(tx) = self.outbound.get(id) else {
            return Delivery::Unknown;
        };

        match tx.try_send(message) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                warn!(connection = %id, "Outbound queue full, evicting participant");
                self.outbound.remove(id);
                Delivery::Evicted
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection = %id, "Participant stream closed");
                self.outbound.remove(id);
                Delivery::Evicted
            }
        }
    }

    /// Deliver to every attached participant independently
    pub fn broadcast(&mut self, message: Outbound) -> FanoutReport {
        let mut report = FanoutReport::default();

        for (id, tx) in &self.outbound {
            match tx.try_send(Arc::clone(&message)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(connection = %id, kind = message.kind(), "Outbound queue full, evicting participant");
                    report.evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(connection = %id, "Participant stream closed");
                    report.evicted.push(*id);
                }
            }
        }

        for id in &report.evicted {
            self.outbound.remove(id);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsync_common::QueueEntryState;

    fn snapshot(urls: &[&str]) -> Outbound {
        Arc::new(ServerMessage::queue_set(
            urls.iter().map(|u| QueueEntryState::loaded(*u)).collect(),
            None,
        ))
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let mut fanout = Fanout::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let mut rx_a = fanout.attach(a, 4);
        let mut rx_b = fanout.attach(b, 4);

        let report = fanout.broadcast(snapshot(&["x", "y"]));
        assert_eq!(report.delivered, 2);
        assert!(report.evicted.is_empty());

        assert_eq!(rx_a.recv().await.unwrap().kind(), "QUEUE_SET");
        assert_eq!(rx_b.recv().await.unwrap().kind(), "QUEUE_SET");
    }

    #[tokio::test]
    async fn test_closed_participant_does_not_block_others() {
        let mut fanout = Fanout::new();
        let gone = ConnectionId::new();
        let live = ConnectionId::new();
        drop(fanout.attach(gone, 4));
        let mut rx_live = fanout.attach(live, 4);

        let report = fanout.broadcast(snapshot(&["x"]));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted, vec![gone]);
        assert!(!fanout.contains(&gone));
        assert!(rx_live.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_full_participant_is_evicted() {
        let mut fanout = Fanout::new();
        let slow = ConnectionId::new();
        let fast = ConnectionId::new();
        let mut rx_slow = fanout.attach(slow, 1);
        let mut rx_fast = fanout.attach(fast, 4);

        fanout.broadcast(snapshot(&["x"]));
        let report = fanout.broadcast(snapshot(&["x", "y"]));

        assert_eq!(report.evicted, vec![slow]);
        assert_eq!(report.delivered, 1);
        assert_eq!(fanout.len(), 1);

        // Slow participant drains what it had, then sees its stream end
        assert!(rx_slow.recv().await.is_some());
        assert!(rx_slow.recv().await.is_none());

        assert!(rx_fast.recv().await.is_some());
        assert!(rx_fast.recv().await.is_some());
    }

    #[test]
    fn test_send_to_unknown() {
        let mut fanout = Fanout::new();
        assert_eq!(
            fanout.send_to(&ConnectionId::new(), snapshot(&[])),
            Delivery::Unknown
        );
    }
}

//! Room actor
//!
//! One tokio task per room owns the room's queue store, participant table and fan-out.
//! Commands arrive through a bounded mpsc channel and are handled one at a time, run to
//! completion, so validation and replacement of the canonical order can never interleave
//! with another mutation. Callers talk to the task through a cloneable [`RoomHandle`].
//!
//! Responsibilities:
//! * Participant lifecycle (join, leave, admin succession)
//! * Authorize, apply and broadcast queue mutations
//! * Close itself after staying empty for the idle timeout

use crate::error::{Error, Result};
use crate::fanout::{Delivery, Fanout, Outbound};
use crate::gate::{Capability, ConnectionInfo, PermissionGate};
use crate::store::{QueueStore, ValidationError};
use bsync_common::config::RoomsConfig;
use bsync_common::{
    ClientRequest, ConnectionId, EntryStatus, EntryUrl, QueueEntryState, RequestId, Role, RoomId,
    ServerMessage,
};
use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Messages queued to a participant on join: `CONNECTED` plus the snapshot
const JOIN_PREAMBLE: usize = 2;

/// Per-room tunables
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub outbound_buffer: usize,
    pub command_buffer: usize,
    pub idle_timeout: Duration,
}

impl From<&RoomsConfig> for RoomSettings {
    fn from(config: &RoomsConfig) -> Self {
        Self {
            outbound_buffer: config.outbound_buffer,
            command_buffer: config.command_buffer,
            idle_timeout: config.idle_timeout(),
        }
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self::from(&RoomsConfig::default())
    }
}

/// Returned to a participant that joined
#[derive(Debug)]
pub struct Joined {
    pub connection: ConnectionInfo,
    pub can_mutate: bool,
    /// Starts with `CONNECTED` and a `QUEUE_SET` snapshot
    pub messages: mpsc::Receiver<Outbound>,
}

pub enum RoomCommand {
    Join {
        client_name: Option<String>,
        reply: oneshot::Sender<Joined>,
    },
    Leave {
        connection_id: ConnectionId,
    },
    Submit {
        connection_id: ConnectionId,
        request: ClientRequest,
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<QueueEntryState>>,
    },
    ReportStatus {
        url: EntryUrl,
        status: EntryStatus,
        reply: oneshot::Sender<Result<bool>>,
    },
}

pub struct RoomActor {
    room_id: RoomId,
    receiver: mpsc::Receiver<RoomCommand>,
    settings: RoomSettings,
    gate: Arc<dyn PermissionGate>,

    store: QueueStore,
    fanout: Fanout,
    connections: HashMap<ConnectionId, ConnectionInfo>,
    next_seq: u64,
    idle_since: Option<Instant>,
}

impl RoomActor {
    pub async fn run(mut self) {
        let span = info_span!("room", room_id = %self.room_id);
        async move {
            info!("Room started");
            loop {
                let idle_deadline = self.idle_since.map(|since| since + self.settings.idle_timeout);
                tokio::select! {
                    command = self.receiver.recv() => match command {
                        Some(command) => self.handle_command(command),
                        None => break,
                    },
                    _ = idle_expiry(idle_deadline) => {
                        info!("Room idle for {:?}, closing", self.settings.idle_timeout);
                        break;
                    }
                }
            }
            info!(entries = self.store.len(), "Room stopped");
        }
        .instrument(span)
        .await
    }

    fn handle_command(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join { client_name, reply } => {
                let joined = self.join(client_name);
                if let Err(joined) = reply.send(joined) {
                    // Caller went away before the reply arrived
                    self.leave(&joined.connection.id);
                }
            }
            RoomCommand::Leave { connection_id } => self.leave(&connection_id),
            RoomCommand::Submit {
                connection_id,
                request,
                reply,
            } => {
                let result = self.handle_request(&connection_id, request);
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.store.current_order());
            }
            RoomCommand::ReportStatus { url, status, reply } => {
                let _ = reply.send(self.report_status(&url, status));
            }
        }
    }

    // ========================================
    // Participants
    // ========================================

    fn join(&mut self, client_name: Option<String>) -> Joined {
        let role = if self.has_admin() {
            Role::Member
        } else {
            Role::Admin
        };
        let connection = ConnectionInfo {
            id: ConnectionId::new(),
            room_id: self.room_id.clone(),
            role,
            client_name,
            joined_seq: self.next_seq,
        };
        self.next_seq += 1;
        self.idle_since = None;

        let messages = self
            .fanout
            .attach(connection.id, self.settings.outbound_buffer);
        let can_mutate = self.gate.can_mutate(&connection);
        self.connections.insert(connection.id, connection.clone());

        info!(
            connection = %connection.id,
            role = %role,
            participants = self.connections.len(),
            "Participant joined"
        );

        self.deliver(&connection.id, self.connected_message(&connection));
        self.deliver(
            &connection.id,
            ServerMessage::queue_set(self.store.current_order(), None),
        );

        Joined {
            connection,
            can_mutate,
            messages,
        }
    }

    fn leave(&mut self, connection_id: &ConnectionId) {
        self.fanout.detach(connection_id);
        if let Some(connection) = self.connections.remove(connection_id) {
            info!(
                connection = %connection.id,
                participants = self.connections.len(),
                "Participant left"
            );
            self.after_departure();
        }
    }

    fn has_admin(&self) -> bool {
        self.connections.values().any(|c| c.role == Role::Admin)
    }

    fn connected_message(&self, connection: &ConnectionInfo) -> ServerMessage {
        ServerMessage::Connected {
            connection_id: connection.id,
            room_id: self.room_id.clone(),
            role: connection.role,
            can_mutate: self.gate.can_mutate(connection),
        }
    }

    /// Keep an admin while anyone remains; start the idle clock when nobody does
    fn after_departure(&mut self) {
        while !self.connections.is_empty() && !self.has_admin() {
            let Some(successor) = self
                .connections
                .values()
                .min_by_key(|c| c.joined_seq)
                .map(|c| c.id)
            else {
                break;
            };

            if let Some(connection) = self.connections.get_mut(&successor) {
                connection.role = Role::Admin;
            }
            info!(connection = %successor, "Promoted participant to admin");

            let message = match self.connections.get(&successor) {
                Some(connection) => self.connected_message(connection),
                None => break,
            };
            if self.fanout.send_to(&successor, Arc::new(message)) == Delivery::Evicted {
                self.connections.remove(&successor);
            }
        }

        if self.connections.is_empty() && self.idle_since.is_none() {
            debug!("Room empty, idle timer started");
            self.idle_since = Some(Instant::now());
        }
    }

    fn deliver(&mut self, connection_id: &ConnectionId, message: ServerMessage) {
        if self.fanout.send_to(connection_id, Arc::new(message)) == Delivery::Evicted
            && self.connections.remove(connection_id).is_some()
        {
            self.after_departure();
        }
    }

    fn broadcast_queue(&mut self, request_id: Option<RequestId>) {
        let message = Arc::new(ServerMessage::queue_set(self.store.current_order(), request_id));
        let report = self.fanout.broadcast(message);
        debug!(
            delivered = report.delivered,
            evicted = report.evicted.len(),
            "Broadcast QUEUE_SET"
        );

        if !report.evicted.is_empty() {
            for id in &report.evicted {
                self.connections.remove(id);
            }
            self.after_departure();
        }
    }

    // ========================================
    // Mutations
    // ========================================

    /// Authorize, then dispatch a participant request
    fn handle_request(&mut self, connection_id: &ConnectionId, request: ClientRequest) -> Result<()> {
        let connection = self
            .connections
            .get(connection_id)
            .cloned()
            .ok_or(Error::ConnectionNotFound(*connection_id))?;

        let capability = match self.gate.authorize(&connection) {
            Ok(capability) => capability,
            Err(denied) => {
                warn!(connection = %connection.id, kind = request.kind(), "{}", denied);
                return Err(denied.into());
            }
        };

        match request {
            ClientRequest::ReorderQueue {
                reordered_entries,
                request_id,
            } => {
                let proposed: Vec<EntryUrl> =
                    reordered_entries.into_iter().map(|entry| entry.url).collect();
                self.reorder(&capability, &proposed, request_id);
            }
            ClientRequest::DeleteEntries { urls, request_id } => {
                self.delete_entries(&capability, &urls, request_id);
            }
            ClientRequest::AddEntries { urls, request_id } => {
                self.add_entries(&capability, &urls, request_id);
            }
        }
        Ok(())
    }

    fn reorder(&mut self, capability: &Capability, proposed: &[EntryUrl], request_id: Option<RequestId>) {
        match self.store.apply_reorder(proposed) {
            Ok(()) => {
                info!(
                    connection = %capability.connection_id,
                    entries = proposed.len(),
                    "Queue reordered"
                );
                self.broadcast_queue(request_id);
            }
            Err(e) => {
                warn!(connection = %capability.connection_id, code = e.code(), "Reorder rejected: {}", e);
                self.reject(&capability.connection_id, request_id, &e);
            }
        }
    }

    fn delete_entries(&mut self, capability: &Capability, urls: &[EntryUrl], request_id: Option<RequestId>) {
        let removed = self.store.remove(urls);
        if removed == 0 {
            debug!(connection = %capability.connection_id, "Delete matched no entries");
            return;
        }
        info!(connection = %capability.connection_id, removed, "Entries deleted");
        self.broadcast_queue(request_id);
    }

    fn add_entries(&mut self, capability: &Capability, urls: &[EntryUrl], request_id: Option<RequestId>) {
        match self.store.append_all(urls) {
            Ok(()) => {
                info!(connection = %capability.connection_id, added = urls.len(), "Entries added");
                self.broadcast_queue(request_id);
            }
            Err(e) => {
                warn!(connection = %capability.connection_id, code = e.code(), "Add rejected: {}", e);
                self.reject(&capability.connection_id, request_id, &e);
            }
        }
    }

    /// Tell the requester, and only the requester, why its request changed nothing
    fn reject(&mut self, connection_id: &ConnectionId, request_id: Option<RequestId>, error: &ValidationError) {
        if let Some(reason) = error.reject_reason() {
            self.deliver(
                connection_id,
                ServerMessage::RequestRejected {
                    request_id,
                    reason,
                    timestamp: Utc::now(),
                },
            );
        }
    }

    /// Load result from the ingestion side; not gated, not a participant request
    fn report_status(&mut self, url: &EntryUrl, status: EntryStatus) -> Result<bool> {
        let changed = self.store.set_status(url.as_str(), status)?;
        if changed {
            debug!(url = %url, "Entry status updated");
            self.broadcast_queue(None);
        }
        Ok(changed)
    }
}

async fn idle_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ========================================
// Handle
// ========================================

#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
    room_id: RoomId,
}

impl RoomHandle {
    pub fn new(room_id: RoomId, mut settings: RoomSettings, gate: Arc<dyn PermissionGate>) -> (Self, RoomActor) {
        // A smaller outbound queue would evict every joiner during its own preamble
        settings.outbound_buffer = settings.outbound_buffer.max(JOIN_PREAMBLE);
        let (sender, receiver) = mpsc::channel(settings.command_buffer.max(1));
        let handle = RoomHandle {
            sender,
            room_id: room_id.clone(),
        };
        let actor = RoomActor {
            room_id,
            receiver,
            settings,
            gate,
            store: QueueStore::new(),
            fanout: Fanout::new(),
            connections: HashMap::new(),
            next_seq: 0,
            idle_since: Some(Instant::now()),
        };
        (handle, actor)
    }

    /// Create a room and run its actor on the current runtime
    pub fn spawn(room_id: RoomId, settings: RoomSettings, gate: Arc<dyn PermissionGate>) -> Self {
        let (handle, actor) = Self::new(room_id, settings, gate);
        tokio::spawn(actor.run());
        handle
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// True once the room task has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn join(&self, client_name: Option<String>) -> Result<Joined> {
        self.request(|reply| RoomCommand::Join { client_name, reply })
            .await
    }

    pub async fn leave(&self, connection_id: ConnectionId) -> Result<()> {
        self.sender
            .send(RoomCommand::Leave { connection_id })
            .await
            .map_err(|_| Error::RoomClosed(self.room_id.clone()))
    }

    /// Leave without awaiting; safe to call from `Drop`
    pub fn leave_detached(&self, connection_id: ConnectionId) {
        match self.sender.try_send(RoomCommand::Leave { connection_id }) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(command)) => {
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    let sender = self.sender.clone();
                    runtime.spawn(async move {
                        let _ = sender.send(command).await;
                    });
                }
            }
        }
    }

    /// Submit a participant request; `Ok` once it passed the permission gate
    pub async fn submit(&self, connection_id: ConnectionId, request: ClientRequest) -> Result<()> {
        self.request(|reply| RoomCommand::Submit {
            connection_id,
            request,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<Vec<QueueEntryState>> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    pub async fn report_status(&self, url: EntryUrl, status: EntryStatus) -> Result<bool> {
        self.request(|reply| RoomCommand::ReportStatus { url, status, reply })
            .await?
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(make(reply))
            .await
            .map_err(|_| Error::RoomClosed(self.room_id.clone()))?;
        response
            .await
            .map_err(|_| Error::RoomClosed(self.room_id.clone()))
    }
}

impl fmt::Display for RoomHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.room_id.as_str())
    }
}

/// Leaves the room when dropped; held by a participant's outbound stream
pub struct LeaveGuard {
    handle: RoomHandle,
    connection_id: ConnectionId,
}

impl LeaveGuard {
    pub fn new(handle: RoomHandle, connection_id: ConnectionId) -> Self {
        Self {
            handle,
            connection_id,
        }
    }
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        self.handle.leave_detached(self.connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::PolicyGate;
    use bsync_common::config::ControlPolicy;
    use bsync_common::protocol::RejectCode;
    use tokio::time::timeout;

    fn settings() -> RoomSettings {
        RoomSettings {
            outbound_buffer: 16,
            command_buffer: 16,
            idle_timeout: Duration::from_secs(60),
        }
    }

    fn spawn(policy: ControlPolicy) -> RoomHandle {
        RoomHandle::spawn(
            RoomId::from("test-room"),
            settings(),
            Arc::new(PolicyGate::new(policy)),
        )
    }

    async fn next(rx: &mut mpsc::Receiver<Outbound>) -> Outbound {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("message within timeout")
            .expect("stream open")
    }

    /// Join and consume the CONNECTED + snapshot preamble
    async fn join(room: &RoomHandle) -> Joined {
        let mut joined = room.join(None).await.unwrap();
        assert_eq!(next(&mut joined.messages).await.kind(), "CONNECTED");
        assert_eq!(next(&mut joined.messages).await.kind(), "QUEUE_SET");
        joined
    }

    fn urls(names: &[&str]) -> Vec<EntryUrl> {
        names.iter().map(|n| EntryUrl::from(*n)).collect()
    }

    fn entry_urls(message: &ServerMessage) -> Vec<String> {
        match message {
            ServerMessage::QueueSet { entries, .. } => {
                entries.iter().map(|e| e.url.to_string()).collect()
            }
            other => panic!("expected QUEUE_SET, got {:?}", other),
        }
    }

    async fn seed(room: &RoomHandle, admin: &mut Joined, names: &[&str]) {
        room.submit(
            admin.connection.id,
            ClientRequest::AddEntries {
                urls: urls(names),
                request_id: None,
            },
        )
        .await
        .unwrap();
        next(&mut admin.messages).await;
    }

    #[tokio::test]
    async fn test_first_joiner_is_admin() {
        let room = spawn(ControlPolicy::AdminOnly);

        let mut first = room.join(Some("host".to_string())).await.unwrap();
        assert_eq!(first.connection.role, Role::Admin);
        assert!(first.can_mutate);

        match &*next(&mut first.messages).await {
            ServerMessage::Connected { role, can_mutate, .. } => {
                assert_eq!(*role, Role::Admin);
                assert!(*can_mutate);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(entry_urls(&*next(&mut first.messages).await).is_empty());

        let second = room.join(None).await.unwrap();
        assert_eq!(second.connection.role, Role::Member);
        assert!(!second.can_mutate);
    }

    #[tokio::test]
    async fn test_reorder_broadcasts_to_all_including_originator() {
        let room = spawn(ControlPolicy::AdminOnly);
        let mut admin = join(&room).await;
        let mut member = join(&room).await;
        seed(&room, &mut admin, &["a", "b", "c", "d"]).await;
        next(&mut member.messages).await;

        let request_id = RequestId::new();
        room.submit(
            admin.connection.id,
            ClientRequest::reorder(urls(&["b", "c", "a", "d"]), Some(request_id)),
        )
        .await
        .unwrap();

        for rx in [&mut admin.messages, &mut member.messages] {
            let message = next(rx).await;
            assert_eq!(entry_urls(&message), ["b", "c", "a", "d"]);
            match &*message {
                ServerMessage::QueueSet { request_id: echoed, .. } => {
                    assert_eq!(*echoed, Some(request_id))
                }
                _ => unreachable!(),
            }
        }

        let snapshot = room.snapshot().await.unwrap();
        let order: Vec<_> = snapshot.iter().map(|e| e.url.to_string()).collect();
        assert_eq!(order, ["b", "c", "a", "d"]);
    }

    #[tokio::test]
    async fn test_member_denied_without_capability() {
        let room = spawn(ControlPolicy::AdminOnly);
        let mut admin = join(&room).await;
        let mut member = join(&room).await;
        seed(&room, &mut admin, &["a", "b"]).await;
        next(&mut member.messages).await;

        let result = room
            .submit(
                member.connection.id,
                ClientRequest::reorder(urls(&["b", "a"]), None),
            )
            .await;
        assert!(matches!(result, Err(Error::Permission(_))));

        let order: Vec<_> = room
            .snapshot()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.url.to_string())
            .collect();
        assert_eq!(order, ["a", "b"]);
        assert!(admin.messages.try_recv().is_err());
        assert!(member.messages.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_everyone_policy_lets_members_reorder() {
        let room = spawn(ControlPolicy::Everyone);
        let mut admin = join(&room).await;
        let mut member = join(&room).await;
        assert!(member.can_mutate);
        seed(&room, &mut admin, &["a", "b"]).await;
        next(&mut member.messages).await;

        room.submit(
            member.connection.id,
            ClientRequest::reorder(urls(&["b", "a"]), None),
        )
        .await
        .unwrap();
        assert_eq!(entry_urls(&*next(&mut admin.messages).await), ["b", "a"]);
    }

    #[tokio::test]
    async fn test_invalid_reorder_rejected_to_requester_only() {
        let room = spawn(ControlPolicy::Everyone);
        let mut admin = join(&room).await;
        let mut member = join(&room).await;
        seed(&room, &mut admin, &["a", "b", "c"]).await;
        next(&mut member.messages).await;

        let request_id = RequestId::new();
        room.submit(
            member.connection.id,
            ClientRequest::reorder(urls(&["c", "a"]), Some(request_id)),
        )
        .await
        .unwrap();

        match &*next(&mut member.messages).await {
            ServerMessage::RequestRejected {
                request_id: echoed,
                reason,
                ..
            } => {
                assert_eq!(*echoed, Some(request_id));
                assert_eq!(reason.code, RejectCode::MissingEntry);
                assert_eq!(reason.url.as_str(), "b");
            }
            other => panic!("unexpected {:?}", other),
        }

        // Snapshot round trip orders after the submit; nothing reached the admin
        room.snapshot().await.unwrap();
        assert!(admin.messages.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_canonical_order_resubmitted_is_identity() {
        let room = spawn(ControlPolicy::AdminOnly);
        let mut admin = join(&room).await;
        seed(&room, &mut admin, &["a", "b", "c"]).await;

        room.submit(
            admin.connection.id,
            ClientRequest::reorder(urls(&["a", "b", "c"]), None),
        )
        .await
        .unwrap();
        assert_eq!(entry_urls(&*next(&mut admin.messages).await), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_delete_and_status_report_broadcast() {
        let room = spawn(ControlPolicy::AdminOnly);
        let mut admin = join(&room).await;
        seed(&room, &mut admin, &["a", "b"]).await;

        assert!(room
            .report_status(EntryUrl::from("a"), EntryStatus::Loaded)
            .await
            .unwrap());
        match &*next(&mut admin.messages).await {
            ServerMessage::QueueSet { entries, .. } => {
                assert_eq!(entries[0].status, EntryStatus::Loaded);
                assert_eq!(entries[1].status, EntryStatus::Loading);
            }
            other => panic!("unexpected {:?}", other),
        }

        room.submit(
            admin.connection.id,
            ClientRequest::DeleteEntries {
                urls: urls(&["a"]),
                request_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(entry_urls(&*next(&mut admin.messages).await), ["b"]);

        assert!(matches!(
            room.report_status(EntryUrl::from("zzz"), EntryStatus::Loaded).await,
            Err(Error::Validation(ValidationError::UnknownEntry(_)))
        ));
    }

    #[tokio::test]
    async fn test_admin_succession() {
        let room = spawn(ControlPolicy::AdminOnly);
        let admin = join(&room).await;
        let mut member = join(&room).await;
        let _late = join(&room).await;

        room.leave(admin.connection.id).await.unwrap();

        match &*next(&mut member.messages).await {
            ServerMessage::Connected { role, can_mutate, .. } => {
                assert_eq!(*role, Role::Admin);
                assert!(*can_mutate);
            }
            other => panic!("unexpected {:?}", other),
        }
        room.submit(
            member.connection.id,
            ClientRequest::AddEntries {
                urls: urls(&["x"]),
                request_id: None,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_connection() {
        let room = spawn(ControlPolicy::Everyone);
        let result = room
            .submit(ConnectionId::new(), ClientRequest::reorder(Vec::<EntryUrl>::new(), None))
            .await;
        assert!(matches!(result, Err(Error::ConnectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_dropped_participant_does_not_block_room() {
        let room = spawn(ControlPolicy::AdminOnly);
        let mut admin = join(&room).await;
        let member = join(&room).await;
        drop(member.messages);

        seed(&room, &mut admin, &["a"]).await;
        seed(&room, &mut admin, &["b"]).await;
        assert_eq!(room.snapshot().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_tiny_outbound_buffer_keeps_joiner() {
        let room = RoomHandle::spawn(
            RoomId::from("tiny"),
            RoomSettings {
                outbound_buffer: 1,
                ..settings()
            },
            Arc::new(PolicyGate::new(ControlPolicy::AdminOnly)),
        );
        let mut admin = join(&room).await;
        seed(&room, &mut admin, &["a", "b"]).await;

        room.submit(
            admin.connection.id,
            ClientRequest::reorder(urls(&["b", "a"]), None),
        )
        .await
        .unwrap();
        assert_eq!(entry_urls(&*next(&mut admin.messages).await), ["b", "a"]);
    }

    #[tokio::test]
    async fn test_idle_room_closes() {
        let room = RoomHandle::spawn(
            RoomId::from("idle"),
            RoomSettings {
                idle_timeout: Duration::from_millis(50),
                ..settings()
            },
            Arc::new(PolicyGate::new(ControlPolicy::Everyone)),
        );
        let joined = join(&room).await;
        drop(LeaveGuard::new(room.clone(), joined.connection.id));

        timeout(Duration::from_secs(2), async {
            while !room.is_closed() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("room closes after idle timeout");
        assert!(matches!(room.snapshot().await, Err(Error::RoomClosed(_))));
    }
}

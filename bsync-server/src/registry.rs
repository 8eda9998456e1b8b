//! Room registry
//!
//! Maps room ids to running room actors. Rooms are created on first join and
//! close themselves after idling empty; a closed handle found here is replaced
//! on the next join.

use crate::error::{Error, Result};
use crate::gate::{PermissionGate, PolicyGate};
use crate::room::{Joined, RoomHandle, RoomSettings};
use bsync_common::config::RoomsConfig;
use bsync_common::RoomId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const MAX_ROOM_ID_LEN: usize = 64;

pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
    settings: RoomSettings,
    gate: Arc<dyn PermissionGate>,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings, gate: Arc<dyn PermissionGate>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            settings,
            gate,
        }
    }

    pub fn from_config(config: &RoomsConfig) -> Self {
        Self::new(
            RoomSettings::from(config),
            Arc::new(PolicyGate::new(config.control_policy)),
        )
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<RoomId, RoomHandle>> {
        // Map holds only handles, so a poisoned lock leaves it consistent
        match self.rooms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Running room for `room_id`, starting one if needed
    pub fn get_or_create(&self, room_id: &RoomId) -> Result<RoomHandle> {
        validate_room_id(room_id)?;

        let mut rooms = self.rooms();
        if let Some(handle) = rooms.get(room_id) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
            debug!(room_id = %room_id, "Replacing closed room");
        }

        let handle = RoomHandle::spawn(room_id.clone(), self.settings.clone(), Arc::clone(&self.gate));
        rooms.insert(room_id.clone(), handle.clone());
        info!(room_id = %room_id, rooms = rooms.len(), "Room created");
        Ok(handle)
    }

    /// Running room for `room_id`; never creates one
    pub fn existing(&self, room_id: &RoomId) -> Result<RoomHandle> {
        let mut rooms = self.rooms();
        match rooms.get(room_id) {
            Some(handle) if !handle.is_closed() => Ok(handle.clone()),
            Some(_) => {
                rooms.remove(room_id);
                Err(Error::RoomNotFound(room_id.clone()))
            }
            None => Err(Error::RoomNotFound(room_id.clone())),
        }
    }

    /// Join a room, creating it if needed
    ///
    /// A room can close on idle between lookup and join; that case is retried
    /// once against a fresh room.
    pub async fn join(&self, room_id: &RoomId, client_name: Option<String>) -> Result<(RoomHandle, Joined)> {
        let handle = self.get_or_create(room_id)?;
        match handle.join(client_name.clone()).await {
            Ok(joined) => Ok((handle, joined)),
            Err(Error::RoomClosed(_)) => {
                let handle = self.get_or_create(room_id)?;
                let joined = handle.join(client_name).await?;
                Ok((handle, joined))
            }
            Err(e) => Err(e),
        }
    }

    /// Drop handles of rooms that have stopped; returns how many were removed
    pub fn prune(&self) -> usize {
        let mut rooms = self.rooms();
        let before = rooms.len();
        rooms.retain(|_, handle| !handle.is_closed());
        before - rooms.len()
    }

    /// Number of registered rooms, including ones not yet pruned
    pub fn len(&self) -> usize {
        self.rooms().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms().is_empty()
    }
}

/// Room ids appear in URLs and logs: ASCII alphanumerics, `-` and `_` only
pub fn validate_room_id(room_id: &RoomId) -> Result<()> {
    let id = room_id.as_str();
    if id.is_empty() || id.len() > MAX_ROOM_ID_LEN {
        return Err(Error::BadRequest(format!(
            "room id must be 1-{} characters",
            MAX_ROOM_ID_LEN
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::BadRequest(format!("invalid room id: {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsync_common::config::ControlPolicy;
    use std::time::Duration;

    fn registry(idle_timeout: Duration) -> RoomRegistry {
        RoomRegistry::new(
            RoomSettings {
                outbound_buffer: 8,
                command_buffer: 8,
                idle_timeout,
            },
            Arc::new(PolicyGate::new(ControlPolicy::AdminOnly)),
        )
    }

    #[test]
    fn test_validate_room_id() {
        assert!(validate_room_id(&RoomId::from("living-room_2")).is_ok());
        assert!(validate_room_id(&RoomId::from("")).is_err());
        assert!(validate_room_id(&RoomId::from("a/b")).is_err());
        assert!(validate_room_id(&RoomId::new("x".repeat(65))).is_err());
    }

    #[tokio::test]
    async fn test_same_room_shared() {
        let registry = registry(Duration::from_secs(60));
        let room = RoomId::from("lobby");

        let (first, a) = registry.join(&room, None).await.unwrap();
        let (second, b) = registry.join(&room, None).await.unwrap();
        assert_eq!(first.room_id(), second.room_id());
        assert_eq!(registry.len(), 1);
        assert_ne!(a.connection.id, b.connection.id);
        assert_eq!(b.connection.role, bsync_common::Role::Member);
    }

    #[tokio::test]
    async fn test_existing_does_not_create() {
        let registry = registry(Duration::from_secs(60));
        assert!(matches!(
            registry.existing(&RoomId::from("nowhere")),
            Err(Error::RoomNotFound(_))
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_closed_room_replaced() {
        let registry = registry(Duration::from_millis(20));
        let room = RoomId::from("brief");

        let handle = registry.get_or_create(&room).unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while !handle.is_closed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(matches!(registry.existing(&room), Err(Error::RoomNotFound(_))));
        let (fresh, joined) = registry.join(&room, None).await.unwrap();
        assert!(!fresh.is_closed());
        assert_eq!(joined.connection.role, bsync_common::Role::Admin);
        assert_eq!(registry.prune(), 0);
    }
}

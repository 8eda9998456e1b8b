//! Permission gate
//!
//! Every mutating request is authorized against the requesting connection before the
//! queue store is touched. The decision is a pure function of the connection record
//! and the room's control policy.

use bsync_common::config::ControlPolicy;
use bsync_common::{ConnectionId, Role, RoomId};
use thiserror::Error;

/// Server-side record of one joined participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub room_id: RoomId,
    pub role: Role,
    pub client_name: Option<String>,
    /// Join order within the room, used for admin succession
    pub joined_seq: u64,
}

/// Proof that a connection was allowed to mutate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub connection_id: ConnectionId,
    pub role: Role,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("connection {connection_id} ({role}) may not mutate the queue")]
    Denied {
        connection_id: ConnectionId,
        role: Role,
    },
}

/// Capability oracle consulted before any mutation
pub trait PermissionGate: Send + Sync {
    fn authorize(&self, connection: &ConnectionInfo) -> Result<Capability, PermissionError>;

    fn can_mutate(&self, connection: &ConnectionInfo) -> bool {
        self.authorize(connection).is_ok()
    }
}

/// Grants mutation by role according to a room control policy
#[derive(Debug, Clone, Copy)]
pub struct PolicyGate {
    policy: ControlPolicy,
}

impl PolicyGate {
    pub fn new(policy: ControlPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ControlPolicy {
        self.policy
    }
}

impl PermissionGate for PolicyGate {
    fn authorize(&self, connection: &ConnectionInfo) -> Result<Capability, PermissionError> {
        let allowed = match self.policy {
            ControlPolicy::Everyone => true,
            ControlPolicy::AdminOnly => connection.role == Role::Admin,
        };

        if allowed {
            Ok(Capability {
                connection_id: connection.id,
                role: connection.role,
            })
        } else {
            Err(PermissionError::Denied {
                connection_id: connection.id,
                role: connection.role,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(role: Role) -> ConnectionInfo {
        ConnectionInfo {
            id: ConnectionId::new(),
            room_id: RoomId::from("lobby"),
            role,
            client_name: None,
            joined_seq: 0,
        }
    }

    #[test]
    fn test_admin_only_policy() {
        let gate = PolicyGate::new(ControlPolicy::AdminOnly);

        let admin = connection(Role::Admin);
        let granted = gate.authorize(&admin).unwrap();
        assert_eq!(granted.connection_id, admin.id);

        let member = connection(Role::Member);
        assert_eq!(
            gate.authorize(&member),
            Err(PermissionError::Denied {
                connection_id: member.id,
                role: Role::Member
            })
        );
        assert!(!gate.can_mutate(&member));
    }

    #[test]
    fn test_everyone_policy() {
        let gate = PolicyGate::new(ControlPolicy::Everyone);
        assert!(gate.can_mutate(&connection(Role::Member)));
        assert!(gate.can_mutate(&connection(Role::Admin)));
    }
}

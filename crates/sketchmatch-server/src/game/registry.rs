use std::collections::hash_map::Entry;
use std::collections::HashMap;

use sketchmatch_lib::{ConnectionId, Role, SessionId};

use super::{GameError, GameResult};

/// A connection that has declared a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub role: Role,
    /// Back-reference to the session this identity plays in. The session itself lives in the store.
    pub session_id: Option<SessionId>,
}

impl Identity {
    /// True while this identity is allowed to sit in `role`'s queue.
    pub fn is_waiting_as(&self, role: Role) -> bool {
        self.role == role && self.session_id.is_none()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    identities: HashMap<ConnectionId, Identity>,
}

impl Registry {
    /// Insert an identity for `connection_id`, replacing any earlier record for it.
    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        role: Role,
        display_name: impl Into<String>,
    ) -> &Identity {
        let identity = Identity {
            connection_id,
            display_name: display_name.into(),
            role,
            session_id: None,
        };
        match self.identities.entry(connection_id) {
            Entry::Occupied(mut entry) => {
                entry.insert(identity);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(identity),
        }
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<&Identity> {
        self.identities.get(&connection_id)
    }

    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<Identity> {
        self.identities.remove(&connection_id)
    }

    pub fn set_session(
        &mut self,
        connection_id: ConnectionId,
        session_id: SessionId,
    ) -> GameResult<()> {
        let identity = self
            .identities
            .get_mut(&connection_id)
            .ok_or(GameError::MissingIdentity(connection_id))?;
        identity.session_id = Some(session_id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

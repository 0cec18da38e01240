use rand::{thread_rng, Rng};
use sketchmatch_lib::ConnectionId;
use std::collections::HashSet;
use std::fmt::Display;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::hub::hub_handle::{HubHandle, HubHandleProvider};

type Connections = Arc<Mutex<HashSet<ConnectionId>>>;

/// Shared by every connection task. Game state itself lives in the hub; this only hands out connection ids
/// and hub handles.
#[derive(Clone, Debug)]
pub struct ServerState {
    connections: Connections,
    hub: HubHandleProvider,
}

impl ServerState {
    pub fn new(hub: HubHandleProvider) -> Self {
        Self {
            connections: Connections::default(),
            hub,
        }
    }

    /// Reserve a fresh id for a new connection. The id is released when the returned [`OwnedId`] drops.
    pub fn add_connection(&self) -> OwnedId {
        let mut connections = lock(&self.connections);
        let mut connection_id;
        loop {
            connection_id = thread_rng().gen::<u32>().into();
            if connections.insert(connection_id) {
                break;
            };
        }
        OwnedId {
            connections: self.connections.clone(),
            id: connection_id,
        }
    }

    pub fn hub_handle(&self, connection_id: ConnectionId) -> HubHandle {
        self.hub.clone().into_handle(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        lock(&self.connections).len()
    }
}

fn lock(connections: &Connections) -> MutexGuard<'_, HashSet<ConnectionId>> {
    // The set is always left consistent, so a panic elsewhere doesn't invalidate it
    connections.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A connection id that is registered in the state and removed from it when dropped.
#[derive(Debug)]
pub struct OwnedId {
    connections: Connections,
    id: ConnectionId,
}

impl Display for OwnedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.id.fmt(f)
    }
}

impl Deref for OwnedId {
    type Target = ConnectionId;

    fn deref(&self) -> &Self::Target {
        &self.id
    }
}

impl Drop for OwnedId {
    fn drop(&mut self) {
        lock(&self.connections).remove(&self.id);
    }
}

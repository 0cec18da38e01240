use std::collections::VecDeque;

use sketchmatch_lib::{ConnectionId, Role};

/// The two FIFO waiting lists, one per role.
///
/// Enqueueing does not deduplicate; the store refuses a second role declaration before it gets here.
#[derive(Debug, Default)]
pub struct RoleQueues {
    drawers: VecDeque<ConnectionId>,
    guessers: VecDeque<ConnectionId>,
}

impl RoleQueues {
    fn queue(&self, role: Role) -> &VecDeque<ConnectionId> {
        match role {
            Role::Drawer => &self.drawers,
            Role::Guesser => &self.guessers,
        }
    }

    fn queue_mut(&mut self, role: Role) -> &mut VecDeque<ConnectionId> {
        match role {
            Role::Drawer => &mut self.drawers,
            Role::Guesser => &mut self.guessers,
        }
    }

    pub fn enqueue(&mut self, role: Role, connection_id: ConnectionId) {
        self.queue_mut(role).push_back(connection_id);
    }

    /// Removes every occurrence of `connection_id` from `role`'s queue. Returns how many were removed.
    pub fn remove(&mut self, role: Role, connection_id: ConnectionId) -> usize {
        let queue = self.queue_mut(role);
        let before = queue.len();
        queue.retain(|&id| id != connection_id);
        before - queue.len()
    }

    #[cfg(test)]
    pub fn front(&self, role: Role) -> Option<ConnectionId> {
        self.queue(role).front().copied()
    }

    pub fn pop(&mut self, role: Role) -> Option<ConnectionId> {
        self.queue_mut(role).pop_front()
    }

    /// Return a popped id to the head of its queue.
    pub fn push_front(&mut self, role: Role, connection_id: ConnectionId) {
        self.queue_mut(role).push_front(connection_id);
    }

    #[cfg(test)]
    pub fn contains(&self, role: Role, connection_id: ConnectionId) -> bool {
        self.queue(role).contains(&connection_id)
    }

    pub fn len(&self, role: Role) -> usize {
        self.queue(role).len()
    }

    /// True when a drawer and a guesser are both waiting.
    pub fn can_pair(&self) -> bool {
        !self.drawers.is_empty() && !self.guessers.is_empty()
    }
}

use sketchmatch_lib::net::Notification;
use sketchmatch_lib::{ConnectionId, Role, SessionId};

use super::store::{Delivery, GameStore, Outbox};
use super::Session;

impl GameStore {
    /// Pair the longest-waiting drawer with the longest-waiting guesser, if there is one of each.
    ///
    /// On success a new [`Session`] is stored, both identities point at it and a `Matched` notification for
    /// each side is pushed to `outbox`. Queue heads that are no longer waiting (evicted, or already in a
    /// session) are discarded along the way.
    pub(super) fn attempt_match(&mut self, outbox: &mut Outbox) -> Option<SessionId> {
        let ((drawer_id, drawer_name), (guesser_id, guesser_name)) = loop {
            if !self.queues.can_pair() {
                return None;
            }
            match (self.pop_waiting(Role::Drawer), self.pop_waiting(Role::Guesser)) {
                (Some(drawer), Some(guesser)) => break (drawer, guesser),
                // Put back whichever head was still valid, keeping its place at the front
                (Some((drawer, _)), None) => self.queues.push_front(Role::Drawer, drawer),
                (None, Some((guesser, _))) => self.queues.push_front(Role::Guesser, guesser),
                (None, None) => {}
            }
        };

        let session_id = self.gen_session_id();
        let session = match Session::new(session_id, drawer_id, guesser_id) {
            Ok(session) => session,
            Err(error) => {
                tracing::error!(%error, "Failed to create session");
                self.queues.push_front(Role::Drawer, drawer_id);
                self.queues.push_front(Role::Guesser, guesser_id);
                return None;
            }
        };

        let matched = Notification::Matched {
            session_id,
            drawer_name,
            guesser_name,
            started_time: session.started_time,
        };
        for id in session.participants() {
            if let Err(error) = self.registry.set_session(id, session_id) {
                tracing::error!(%error, "Paired connection vanished from the registry");
            }
            outbox.push(Delivery::new(id, matched.clone()));
        }
        self.sessions.insert(session_id, session);
        tracing::info!(%session_id, %drawer_id, %guesser_id, "Session created");

        Some(session_id)
    }

    /// Pop the head of `role`'s queue along with its display name. A stale head is dropped and `None` is
    /// returned.
    fn pop_waiting(&mut self, role: Role) -> Option<(ConnectionId, String)> {
        let id = self.queues.pop(role)?;
        match self.registry.get(id) {
            Some(identity) if identity.is_waiting_as(role) => Some((id, identity.display_name.clone())),
            _ => {
                tracing::warn!(connection_id = %id, "Discarded stale {role} queue entry");
                None
            }
        }
    }
}

use std::collections::HashMap;

use rand::{thread_rng, Rng};
use sketchmatch_lib::net::Notification;
use sketchmatch_lib::{ConnectionId, Difficulty, Role, SessionId};
use tokio::time::Instant;
use tracing::instrument;

use super::scoring::Archive;
use super::{GameError, GameResult, Registry, RoleQueues, Session};

/// A notification addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub notification: Notification,
}

impl Delivery {
    pub fn new(to: ConnectionId, notification: Notification) -> Self {
        Self { to, notification }
    }
}

/// Notifications produced by a single store operation, in the order they should be sent.
pub type Outbox = Vec<Delivery>;

/// All mutable game state: who is connected, who is waiting, which sessions are live and what has been played.
///
/// Operations are synchronous and never touch the network. Whatever should be sent as a result is returned
/// as an [`Outbox`] for the caller to deliver.
#[derive(Debug, Default)]
pub struct GameStore {
    pub(super) registry: Registry,
    pub(super) queues: RoleQueues,
    pub(super) sessions: HashMap<SessionId, Session>,
    archive: Archive,
}

impl GameStore {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn queues(&self) -> &RoleQueues {
        &self.queues
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    #[cfg(test)]
    pub fn session(&self, session_id: SessionId) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Find the session `actor` is currently playing in.
    pub fn session_of(&self, actor: ConnectionId) -> GameResult<SessionId> {
        let identity = self
            .registry
            .get(actor)
            .ok_or(GameError::MissingIdentity(actor))?;
        identity
            .session_id
            .filter(|id| self.sessions.contains_key(id))
            .ok_or(GameError::MissingSession(actor))
    }

    fn session_mut(
        &mut self,
        session_id: SessionId,
        actor: ConnectionId,
    ) -> GameResult<&mut Session> {
        self.sessions
            .get_mut(&session_id)
            .ok_or(GameError::MissingSession(actor))
    }

    /// Drop a session and every identity that plays in it.
    fn evict(&mut self, session_id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&session_id)?;
        for id in session.participants() {
            self.registry.remove(id);
        }
        Some(session)
    }

    pub(super) fn gen_session_id(&self) -> SessionId {
        let mut session_id;
        loop {
            session_id = thread_rng().gen::<u64>().into();
            if !self.sessions.contains_key(&session_id) {
                break;
            };
        }
        session_id
    }
}

// ----------------------------------------------------------------------------
// Event Handlers
// ----------------------------------------------------------------------------
impl GameStore {
    /// Register `connection_id` in `role` and queue it, then try to pair it.
    ///
    /// # Errors
    ///
    /// A connection that already holds an identity (queued or playing) can't declare again until that
    /// identity is gone. Returns [`GameError::DuplicateEnqueue`] in that case.
    #[instrument(skip(self, display_name))]
    pub fn declare(
        &mut self,
        connection_id: ConnectionId,
        role: Role,
        display_name: String,
    ) -> GameResult<Outbox> {
        if self.registry.get(connection_id).is_some() {
            return Err(GameError::DuplicateEnqueue(connection_id));
        }

        self.registry.register(connection_id, role, display_name);
        self.queues.enqueue(role, connection_id);
        tracing::info!("Connection is waiting as a {role}");

        let mut outbox = Outbox::new();
        if self.attempt_match(&mut outbox).is_none() {
            outbox.push(Delivery::new(connection_id, Notification::WaitingForPlayer));
        }
        Ok(outbox)
    }

    #[instrument(skip(self, word))]
    pub fn select_word(
        &mut self,
        session_id: SessionId,
        actor: ConnectionId,
        word: String,
        difficulty: Option<Difficulty>,
    ) -> GameResult<Outbox> {
        let session = self.session_mut(session_id, actor)?;
        session.select_word(actor, word, difficulty)?;
        tracing::info!("Word selected");

        Ok(session
            .participants()
            .into_iter()
            .map(|id| Delivery::new(id, Notification::GameStarted))
            .collect())
    }

    #[instrument(skip(self, frame), fields(len = frame.len()))]
    pub fn update_canvas(
        &mut self,
        session_id: SessionId,
        actor: ConnectionId,
        frame: Vec<u8>,
    ) -> GameResult<Outbox> {
        let session = self.session_mut(session_id, actor)?;
        session.update_canvas(actor, frame.clone())?;

        Ok(vec![Delivery::new(
            session.guesser_id,
            Notification::CanvasUpdated { canvas: frame },
        )])
    }

    #[instrument(skip(self, guess))]
    pub fn submit_guess(
        &mut self,
        session_id: SessionId,
        actor: ConnectionId,
        guess: &str,
    ) -> GameResult<Outbox> {
        let session = self.session_mut(session_id, actor)?;
        if !session.check_guess(actor, guess)? {
            tracing::debug!("Incorrect guess");
            return Ok(vec![Delivery::new(actor, Notification::GuessIncorrect)]);
        }

        let round = session.finish(Instant::now());
        let notification = Notification::GameFinished {
            duration_seconds: round.duration_seconds,
            points: round.points_awarded,
        };
        let outbox = session
            .participants()
            .into_iter()
            .map(|id| Delivery::new(id, notification.clone()))
            .collect();

        self.archive.record(round);
        self.evict(session_id);
        tracing::info!("Session finished");
        Ok(outbox)
    }

    /// Tear down a session whose participant dropped. Both identities are evicted, including the one that
    /// is still connected, which is told via [`Notification::GameStopped`].
    #[instrument(skip(self))]
    fn abandon(&mut self, session_id: SessionId, dropped: ConnectionId) -> Outbox {
        let Some(mut session) = self.evict(session_id) else {
            tracing::warn!("Attempted to abandon a session that doesn't exist");
            self.registry.remove(dropped);
            return Outbox::new();
        };
        session.abandon();
        tracing::info!("Session abandoned");

        session
            .peer_of(dropped)
            .map(|peer| Delivery::new(peer, Notification::GameStopped { session_id }))
            .into_iter()
            .collect()
    }

    /// Unwind whatever `connection_id` was doing when its connection was lost.
    #[instrument(skip(self))]
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Outbox {
        let Some(identity) = self.registry.get(connection_id) else {
            return Outbox::new();
        };
        let (role, session_id) = (identity.role, identity.session_id);

        if let Some(session_id) = session_id {
            return self.abandon(session_id, connection_id);
        }

        self.queues.remove(role, connection_id);
        self.registry.remove(connection_id);
        tracing::info!("Left the {role} queue");
        Outbox::new()
    }
}

use std::time::SystemTime;

use sketchmatch_lib::{ConnectionId, Difficulty, SessionId};
use tokio::time::Instant;

use super::scoring::{self, ArchivedRound};
use super::{GameError, GameResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Both players are matched, the drawer hasn't picked a word yet.
    Paired,
    InProgress,
    Finished,
    Abandoned,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Finished | SessionState::Abandoned)
    }
}

/// One round between a drawer and a guesser.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub drawer_id: ConnectionId,
    pub guesser_id: ConnectionId,
    pub selected_word: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Latest canvas frame only, earlier frames are discarded.
    pub canvas: Option<Vec<u8>>,
    /// Monotonic start used for scoring.
    pub started_at: Instant,
    /// Wall-clock start reported to clients.
    pub started_time: SystemTime,
    pub state: SessionState,
}

impl Session {
    pub fn new(
        id: SessionId,
        drawer_id: ConnectionId,
        guesser_id: ConnectionId,
    ) -> GameResult<Self> {
        if drawer_id == guesser_id {
            return Err(GameError::SamePlayer(drawer_id));
        }

        Ok(Self {
            id,
            drawer_id,
            guesser_id,
            selected_word: None,
            difficulty: None,
            canvas: None,
            started_at: Instant::now(),
            started_time: SystemTime::now(),
            state: SessionState::Paired,
        })
    }

    pub fn participants(&self) -> [ConnectionId; 2] {
        [self.drawer_id, self.guesser_id]
    }

    /// The other participant, if `connection_id` is part of this session.
    pub fn peer_of(&self, connection_id: ConnectionId) -> Option<ConnectionId> {
        if connection_id == self.drawer_id {
            Some(self.guesser_id)
        } else if connection_id == self.guesser_id {
            Some(self.drawer_id)
        } else {
            None
        }
    }

    fn require_drawer(&self, actor: ConnectionId) -> GameResult<()> {
        if actor != self.drawer_id {
            return Err(GameError::UnauthorizedActor(actor));
        }
        Ok(())
    }

    fn require_guesser(&self, actor: ConnectionId) -> GameResult<()> {
        if actor != self.guesser_id {
            return Err(GameError::UnauthorizedActor(actor));
        }
        Ok(())
    }

    pub fn select_word(
        &mut self,
        actor: ConnectionId,
        word: String,
        difficulty: Option<Difficulty>,
    ) -> GameResult<()> {
        self.require_drawer(actor)?;
        if self.state != SessionState::Paired {
            return Err(GameError::WordAlreadySelected(self.id));
        }

        self.selected_word = Some(word);
        self.difficulty = difficulty;
        self.state = SessionState::InProgress;
        Ok(())
    }

    pub fn update_canvas(&mut self, actor: ConnectionId, frame: Vec<u8>) -> GameResult<()> {
        self.require_drawer(actor)?;
        self.canvas = Some(frame);
        Ok(())
    }

    /// Exact, case-sensitive comparison against the selected word.
    pub fn check_guess(&self, actor: ConnectionId, guess: &str) -> GameResult<bool> {
        self.require_guesser(actor)?;
        match &self.selected_word {
            Some(word) if self.state == SessionState::InProgress => Ok(word == guess),
            _ => Err(GameError::WordNotSelected(self.id)),
        }
    }

    /// Score the round and move to [`SessionState::Finished`].
    pub fn finish(&mut self, now: Instant) -> ArchivedRound {
        debug_assert!(!self.state.is_terminal(), "Session finalized twice");
        let duration_seconds = scoring::elapsed_seconds(self.started_at, now);
        self.state = SessionState::Finished;

        ArchivedRound {
            session_id: self.id,
            duration_seconds,
            points_awarded: scoring::points(self.difficulty, duration_seconds),
        }
    }

    pub fn abandon(&mut self) {
        debug_assert!(!self.state.is_terminal(), "Session finalized twice");
        self.state = SessionState::Abandoned;
    }
}

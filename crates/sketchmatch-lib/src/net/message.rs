use std::time::SystemTime;

use crate::{ConnectionId, Difficulty, Role, SessionId};
use serde::{Deserialize, Serialize};

use super::ProtocolError;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum Message {
    Error { error: ProtocolError },
    Version { version: String },
    /// Liveness probe. Answered with a [`Message::Pong`], after which the server closes the connection.
    Ping,
    Pong { message: String },
    ConnectionAccept { connection_id: ConnectionId },
    /// Client -> server gameplay event.
    Event(Event),
    /// Server -> client notification.
    Notify(Envelope),
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<Envelope> for Message {
    fn from(envelope: Envelope) -> Self {
        Self::Notify(envelope)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub enum Event {
    DeclareDrawer {
        display_name: String,
    },
    DeclareGuesser {
        display_name: String,
    },
    WordSelected {
        selected_word: String,
        difficulty: Option<Difficulty>,
    },
    CanvasUpdated {
        canvas: Vec<u8>,
    },
    GuessSubmitted {
        guessing_word: String,
    },
}

impl Event {
    pub fn declare(role: Role, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        match role {
            Role::Drawer => Self::DeclareDrawer { display_name },
            Role::Guesser => Self::DeclareGuesser { display_name },
        }
    }

    /// Short name for logging. Canvas payloads are too large to print.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::DeclareDrawer { .. } => "declare-drawer",
            Event::DeclareGuesser { .. } => "declare-guesser",
            Event::WordSelected { .. } => "word-selected",
            Event::CanvasUpdated { .. } => "canvas-updated",
            Event::GuessSubmitted { .. } => "guess-submitted",
        }
    }
}

/// Every notification is stamped with the server time it was produced at.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Envelope {
    pub timestamp: SystemTime,
    pub notification: Notification,
}

impl Envelope {
    pub fn now(notification: Notification) -> Self {
        Self {
            timestamp: SystemTime::now(),
            notification,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum Notification {
    WaitingForPlayer,
    Matched {
        session_id: SessionId,
        drawer_name: String,
        guesser_name: String,
        started_time: SystemTime,
    },
    /// The drawer has picked a word. The word itself is never sent.
    GameStarted,
    CanvasUpdated {
        canvas: Vec<u8>,
    },
    GameFinished {
        duration_seconds: f64,
        points: u64,
    },
    GuessIncorrect,
    /// The other participant dropped and the round was abandoned.
    GameStopped {
        session_id: SessionId,
    },
}

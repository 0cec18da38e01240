use sketchmatch_lib::{ConnectionId, SessionId};
use thiserror::Error;

pub use diagnostics::Diagnostics;
pub use queue::RoleQueues;
pub use registry::Registry;
pub use session::Session;
pub use store::{GameStore, Outbox};

#[cfg(test)]
pub use self::{diagnostics::ErrorKind, session::SessionState, store::Delivery};

mod diagnostics;
mod matchmaker;
mod queue;
mod registry;
mod scoring;
mod session;
mod store;

/// Reasons an inbound event is dropped. None of these are fatal and none are reported back to the sender.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Event from connection {0:#} which has not declared a role")]
    MissingIdentity(ConnectionId),
    #[error("Connection {0:#} is not part of an active session")]
    MissingSession(ConnectionId),
    #[error("Connection {0:#} is not allowed to perform this action")]
    UnauthorizedActor(ConnectionId),
    #[error("Connection {0:#} already declared a role")]
    DuplicateEnqueue(ConnectionId),
    #[error("A word was already selected for session {0:#}")]
    WordAlreadySelected(SessionId),
    #[error("No word has been selected for session {0:#} yet")]
    WordNotSelected(SessionId),
    #[error("Connection {0:#} can't be paired with itself")]
    SamePlayer(ConnectionId),
}

pub type GameResult<T> = Result<T, GameError>;

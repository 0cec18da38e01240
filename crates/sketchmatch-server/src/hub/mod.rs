use thiserror::Error;
use tokio::sync::mpsc;

use crate::game::GameError;

use self::{hub_actor::HubActor, hub_handle::HubHandleProvider};

mod hub_actor;
pub mod hub_handle;
mod relay;

/// Capacity of each connection's outbound notification queue.
pub const OUTBOUND_CAPACITY: usize = 64;

#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum HubError {
    #[error(transparent)]
    Rejected(#[from] GameError),
    #[error("The Hub Handle is no longer connected to a hub.")]
    HandleInvalid,
}

pub type HubResult<T> = Result<T, HubError>;

/// Spawn the hub actor that owns all game state.
pub fn start_hub() -> HubHandleProvider {
    let (sender, receiver) = mpsc::channel(256);
    tokio::spawn(HubActor::new(receiver).run());
    HubHandleProvider { sender }
}

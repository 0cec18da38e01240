use sketchmatch_lib::{net::Message, ConnectionId, Difficulty, Role};
use tokio::sync::{mpsc, oneshot};

use crate::game::GameResult;

use super::hub_actor::HubAction;
use super::{HubError, HubResult};

#[derive(Clone, Debug)]
pub struct HubHandleProvider {
    pub(crate) sender: mpsc::Sender<HubAction>,
}

impl HubHandleProvider {
    /// Create the handle a single connection uses to talk to the hub. Dropping it reports the connection as
    /// lost.
    pub fn into_handle(self, connection_id: impl Into<ConnectionId>) -> HubHandle {
        HubHandle {
            sender: self.sender,
            connection_id: connection_id.into(),
            left: false,
        }
    }
}

#[derive(Debug)]
pub struct HubHandle {
    pub(crate) sender: mpsc::Sender<HubAction>,
    pub(super) connection_id: ConnectionId,
    left: bool,
}

impl HubHandle {
    async fn execute(
        &self,
        msg: HubAction,
        rx: oneshot::Receiver<GameResult<()>>,
    ) -> HubResult<()> {
        // Ignore first error, if there is an error, rx.await will fail as well since it's sender
        // will have been dropped
        let _ = self.sender.send(msg).await;
        rx.await
            .map_err(|_| HubError::HandleInvalid)?
            .map_err(HubError::from)
    }

    /// Hand the hub the queue this connection's notifications should be written to.
    pub async fn connect(&self, outbound: mpsc::Sender<Message>) -> HubResult<()> {
        self.sender
            .send(HubAction::Connect {
                id: self.connection_id,
                outbound,
            })
            .await
            .map_err(|_| HubError::HandleInvalid)
    }

    pub async fn declare(&self, role: Role, display_name: String) -> HubResult<()> {
        let (tx, rx) = oneshot::channel();
        let msg = HubAction::Declare {
            respond_to: tx,
            id: self.connection_id,
            role,
            display_name,
        };
        self.execute(msg, rx).await
    }

    pub async fn select_word(&self, word: String, difficulty: Option<Difficulty>) -> HubResult<()> {
        let (tx, rx) = oneshot::channel();
        let msg = HubAction::SelectWord {
            respond_to: tx,
            id: self.connection_id,
            word,
            difficulty,
        };
        self.execute(msg, rx).await
    }

    pub async fn update_canvas(&self, canvas: Vec<u8>) -> HubResult<()> {
        let (tx, rx) = oneshot::channel();
        let msg = HubAction::UpdateCanvas {
            respond_to: tx,
            id: self.connection_id,
            canvas,
        };
        self.execute(msg, rx).await
    }

    /// Report the connection as gone. Returns once the hub has the disconnect queued, so it is handled
    /// before anything sent after this returns.
    pub async fn leave(mut self) {
        self.left = true;
        let id = self.connection_id;
        if let Err(e) = self.sender.send(HubAction::Disconnect { id }).await {
            tracing::warn!(%e, "Failed to report disconnect to the hub.");
        }
    }

    pub async fn submit_guess(&self, guess: String) -> HubResult<()> {
        let (tx, rx) = oneshot::channel();
        let msg = HubAction::SubmitGuess {
            respond_to: tx,
            id: self.connection_id,
            guess,
        };
        self.execute(msg, rx).await
    }
}

impl Drop for HubHandle {
    fn drop(&mut self) {
        if self.left {
            return;
        }
        let tx = self.sender.clone();
        let id = self.connection_id;
        tokio::spawn(async move {
            if let Err(e) = tx.send(HubAction::Disconnect { id }).await {
                tracing::warn!(%e, "Failed to report disconnect to the hub.");
            }
        });
    }
}

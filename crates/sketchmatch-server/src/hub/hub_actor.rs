use sketchmatch_lib::net::Message;
use sketchmatch_lib::{ConnectionId, Difficulty, Role};
use tokio::sync::{mpsc, oneshot};
use tracing::instrument;

use crate::game::{Diagnostics, GameResult, GameStore, Outbox};

use super::relay::Relay;

/// Sole owner of the game state. Every mutation goes through this actor's queue, so each action runs to
/// completion before the next one starts.
pub struct HubActor {
    receiver: mpsc::Receiver<HubAction>,
    store: GameStore,
    relay: Relay,
    diagnostics: Diagnostics,
}

#[derive(Debug)]
pub enum HubAction {
    Connect {
        id: ConnectionId,
        outbound: mpsc::Sender<Message>,
    },
    Declare {
        respond_to: oneshot::Sender<GameResult<()>>,
        id: ConnectionId,
        role: Role,
        display_name: String,
    },
    SelectWord {
        respond_to: oneshot::Sender<GameResult<()>>,
        id: ConnectionId,
        word: String,
        difficulty: Option<Difficulty>,
    },
    UpdateCanvas {
        respond_to: oneshot::Sender<GameResult<()>>,
        id: ConnectionId,
        canvas: Vec<u8>,
    },
    SubmitGuess {
        respond_to: oneshot::Sender<GameResult<()>>,
        id: ConnectionId,
        guess: String,
    },
    Disconnect {
        id: ConnectionId,
    },
}

impl HubActor {
    pub fn new(receiver: mpsc::Receiver<HubAction>) -> Self {
        Self {
            receiver,
            store: GameStore::default(),
            relay: Relay::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    #[instrument(skip_all)]
    pub async fn run(mut self) {
        tracing::info!("Hub opened");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                HubAction::Connect { id, outbound } => self.connect(id, outbound),
                HubAction::Declare {
                    respond_to,
                    id,
                    role,
                    display_name,
                } => {
                    let _ = respond_to.send(self.declare(id, role, display_name));
                }
                HubAction::SelectWord {
                    respond_to,
                    id,
                    word,
                    difficulty,
                } => {
                    let _ = respond_to.send(self.select_word(id, word, difficulty));
                }
                HubAction::UpdateCanvas {
                    respond_to,
                    id,
                    canvas,
                } => {
                    let _ = respond_to.send(self.update_canvas(id, canvas));
                }
                HubAction::SubmitGuess {
                    respond_to,
                    id,
                    guess,
                } => {
                    let _ = respond_to.send(self.submit_guess(id, guess));
                }
                HubAction::Disconnect { id } => self.disconnect(id),
            }
            self.log_state();
        }

        tracing::info!("Closing hub");
    }

    /// Deliver the outcome of a store operation, or count why it was dropped.
    fn apply(&mut self, result: GameResult<Outbox>) -> GameResult<()> {
        match result {
            Ok(outbox) => {
                self.relay.deliver(outbox);
                Ok(())
            }
            Err(error) => {
                self.diagnostics.record(&error);
                tracing::warn!(%error, "Dropped event");
                Err(error)
            }
        }
    }

    fn log_state(&self) {
        tracing::debug!(
            drawers = self.store.queues().len(Role::Drawer),
            guessers = self.store.queues().len(Role::Guesser),
            identities = self.store.registry().len(),
            sessions = self.store.active_sessions(),
            rounds = self.store.archive().rounds().len(),
            rejected = self.diagnostics.total(),
            by_kind = %self.diagnostics,
            "Hub state"
        );
    }
}

// ----------------------------------------------------------------------------
// Message Handlers
// ----------------------------------------------------------------------------
impl HubActor {
    #[instrument(skip(self, outbound))]
    fn connect(&mut self, connection_id: ConnectionId, outbound: mpsc::Sender<Message>) {
        self.relay.attach(connection_id, outbound);
        tracing::debug!("Outbound channel attached");
    }

    #[instrument(skip(self, display_name))]
    fn declare(
        &mut self,
        connection_id: ConnectionId,
        role: Role,
        display_name: String,
    ) -> GameResult<()> {
        let result = self.store.declare(connection_id, role, display_name);
        self.apply(result)
    }

    #[instrument(skip(self, word))]
    fn select_word(
        &mut self,
        connection_id: ConnectionId,
        word: String,
        difficulty: Option<Difficulty>,
    ) -> GameResult<()> {
        let result = self
            .store
            .session_of(connection_id)
            .and_then(|session_id| {
                self.store
                    .select_word(session_id, connection_id, word, difficulty)
            });
        self.apply(result)
    }

    #[instrument(skip_all, fields(%connection_id))]
    fn update_canvas(&mut self, connection_id: ConnectionId, canvas: Vec<u8>) -> GameResult<()> {
        let result = self
            .store
            .session_of(connection_id)
            .and_then(|session_id| self.store.update_canvas(session_id, connection_id, canvas));
        self.apply(result)
    }

    #[instrument(skip(self, guess))]
    fn submit_guess(&mut self, connection_id: ConnectionId, guess: String) -> GameResult<()> {
        let result = self
            .store
            .session_of(connection_id)
            .and_then(|session_id| self.store.submit_guess(session_id, connection_id, &guess));
        self.apply(result)
    }

    /// The connection is gone: unwind its queue entry or session, then forget its outbound channel.
    #[instrument(skip(self))]
    fn disconnect(&mut self, connection_id: ConnectionId) {
        let outbox = self.store.disconnect(connection_id);
        self.relay.detach(connection_id);
        self.relay.deliver(outbox);
        tracing::info!("Connection left the hub");
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use sketchmatch_lib::net::{Message, Notification};
    use sketchmatch_lib::{Difficulty, Role};
    use tokio::{sync::mpsc, time::timeout};

    use crate::game::{ErrorKind, GameError};
    use crate::hub::hub_handle::HubHandleProvider;

    use super::HubActor;

    fn setup() -> HubActor {
        let (_, rx) = mpsc::channel(2);
        HubActor::new(rx)
    }

    fn connect(hub: &mut HubActor, id: u32) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(16);
        hub.connect(id.into(), tx);
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<Message>) -> Vec<Notification> {
        std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| match m {
                Message::Notify(envelope) => envelope.notification,
                m => panic!("Unexpected message {m:?}"),
            })
            .collect()
    }

    fn paired() -> (HubActor, mpsc::Receiver<Message>, mpsc::Receiver<Message>) {
        let mut hub = setup();
        let mut drawer = connect(&mut hub, 1);
        let mut guesser = connect(&mut hub, 2);
        hub.declare(1.into(), Role::Drawer, "pablo".to_owned()).unwrap();
        hub.declare(2.into(), Role::Guesser, "sherlock".to_owned()).unwrap();
        drain(&mut drawer);
        drain(&mut guesser);
        (hub, drawer, guesser)
    }

    #[test]
    fn declare_notifies_waiting_then_matched() {
        let mut hub = setup();
        let mut drawer = connect(&mut hub, 1);
        let mut guesser = connect(&mut hub, 2);

        hub.declare(1.into(), Role::Drawer, "pablo".to_owned()).unwrap();
        assert_eq!(drain(&mut drawer), vec![Notification::WaitingForPlayer]);

        hub.declare(2.into(), Role::Guesser, "sherlock".to_owned()).unwrap();
        let drawer_saw = drain(&mut drawer);
        let guesser_saw = drain(&mut guesser);
        let [Notification::Matched {
            session_id,
            drawer_name,
            guesser_name,
            ..
        }] = &drawer_saw[..]
        else {
            panic!("Drawer was not told about the match");
        };
        assert_eq!(drawer_name, "pablo");
        assert_eq!(guesser_name, "sherlock");

        let [Notification::Matched {
            session_id: guesser_session,
            ..
        }] = &guesser_saw[..]
        else {
            panic!("Guesser was not told about the match");
        };
        assert_eq!(session_id, guesser_session);
    }

    #[test]
    fn game_started_withholds_word() {
        let (mut hub, mut drawer, mut guesser) = paired();

        hub.select_word(1.into(), "cat".to_owned(), Some(Difficulty::Easy))
            .unwrap();
        assert_eq!(drain(&mut drawer), vec![Notification::GameStarted]);
        assert_eq!(drain(&mut guesser), vec![Notification::GameStarted]);
    }

    #[test]
    fn rejected_events_are_counted_and_silent() {
        let (mut hub, mut drawer, mut guesser) = paired();

        assert_eq!(
            hub.select_word(2.into(), "cat".to_owned(), None),
            Err(GameError::UnauthorizedActor(2.into()))
        );
        assert_eq!(
            hub.submit_guess(77.into(), "cat".to_owned()),
            Err(GameError::MissingIdentity(77.into()))
        );
        assert!(hub
            .declare(1.into(), Role::Guesser, "again".to_owned())
            .is_err());

        assert!(drain(&mut drawer).is_empty());
        assert!(drain(&mut guesser).is_empty());
        assert_eq!(hub.diagnostics.count(ErrorKind::UnauthorizedActor), 1);
        assert_eq!(hub.diagnostics.count(ErrorKind::MissingIdentity), 1);
        assert_eq!(hub.diagnostics.count(ErrorKind::DuplicateEnqueue), 1);
    }

    #[test]
    fn canvas_frames_reach_guesser_only() {
        let (mut hub, mut drawer, mut guesser) = paired();

        for frame in 0..3u8 {
            hub.update_canvas(1.into(), vec![frame]).unwrap();
        }

        assert!(drain(&mut drawer).is_empty());
        assert_eq!(
            drain(&mut guesser),
            (0..3u8)
                .map(|frame| Notification::CanvasUpdated {
                    canvas: vec![frame]
                })
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn guesses() {
        let (mut hub, mut drawer, mut guesser) = paired();
        hub.select_word(1.into(), "cat".to_owned(), None).unwrap();
        drain(&mut drawer);
        drain(&mut guesser);

        hub.submit_guess(2.into(), "dog".to_owned()).unwrap();
        assert!(drain(&mut drawer).is_empty());
        assert_eq!(drain(&mut guesser), vec![Notification::GuessIncorrect]);

        hub.submit_guess(2.into(), "cat".to_owned()).unwrap();
        assert!(matches!(
            &drain(&mut drawer)[..],
            [Notification::GameFinished { .. }]
        ));
        assert!(matches!(
            &drain(&mut guesser)[..],
            [Notification::GameFinished { .. }]
        ));
        assert_eq!(hub.store.archive().rounds().len(), 1);
        assert_eq!(hub.store.active_sessions(), 0);
    }

    #[test]
    fn disconnect_stops_peer() {
        let (mut hub, _drawer, mut guesser) = paired();
        let session_id = hub.store.session_of(2.into()).unwrap();

        hub.disconnect(1.into());
        assert_eq!(
            drain(&mut guesser),
            vec![Notification::GameStopped { session_id }]
        );
        assert!(hub.store.registry().is_empty());
        assert!(!hub.relay.is_attached(1.into()));
        assert!(hub.relay.is_attached(2.into()));

        // The survivor may queue up again on the same connection
        hub.declare(2.into(), Role::Guesser, "sherlock".to_owned()).unwrap();
        assert_eq!(drain(&mut guesser), vec![Notification::WaitingForPlayer]);
    }

    #[tokio::test]
    async fn hub_dies() {
        // The hub will run for as long as senders remain
        {
            let (tx, rx) = mpsc::channel(2);
            let actor = HubActor::new(rx);
            timeout(Duration::from_millis(50), actor.run())
                .await
                .expect_err("Hub closed with senders still remaining");
            drop(tx)
        }

        // The hub will die when the last sender is dropped
        {
            let (tx, rx) = mpsc::channel(2);
            let actor = HubActor::new(rx);
            let provider = HubHandleProvider { sender: tx };
            drop(provider);
            timeout(Duration::from_millis(50), actor.run())
                .await
                .expect("Hub failed to close");
        }
    }
}

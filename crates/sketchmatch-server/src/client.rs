use abort_on_drop::ChildTask;
use sketchmatch_lib::net::connection::{self, ConnectionRx, ConnectionTx};
use sketchmatch_lib::net::{Event, Message, ProtocolError};
use sketchmatch_lib::Role;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::instrument;

use crate::hub::hub_handle::HubHandle;
use crate::hub::{HubError, HubResult, OUTBOUND_CAPACITY};
use crate::state::{OwnedId, ServerState};

/// Static acknowledgment returned to liveness probes.
pub const PONG: &str = "Hey! This is your server response!";

/// Take a socket for a newly connected client and begin serving it.
pub async fn handle_new_connection(state: ServerState, socket: TcpStream) {
    let (conn_tx, conn_rx) = connection::from_socket(socket);
    serve(state, conn_tx, conn_rx).await;
}

/// Serve one framed connection until it closes.
pub async fn serve<R, W>(state: ServerState, conn_tx: ConnectionTx<W>, conn_rx: ConnectionRx<R>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let client = match ConnectingClient::new(state, conn_tx, conn_rx)
        .handshake()
        .await
    {
        Some(c) => c,
        None => return,
    };
    client.run().await;
}

/// Represents a client who just connected and hasn't completed the version handshake.
struct ConnectingClient<R, W> {
    state: ServerState,
    connection_id: OwnedId,
    conn_tx: ConnectionTx<W>,
    conn_rx: ConnectionRx<R>,
}

/// What the first frame of a connection asked for.
enum Greeting {
    Play,
    Probe,
}

impl<R, W> ConnectingClient<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn new(state: ServerState, conn_tx: ConnectionTx<W>, conn_rx: ConnectionRx<R>) -> Self {
        let connection_id = state.add_connection();
        Self {
            state,
            connection_id,
            conn_tx,
            conn_rx,
        }
    }

    async fn handshake(mut self) -> Option<PlayerClient<R>> {
        match self.try_handshake().await {
            Ok(Greeting::Play) => PlayerClient::from_connecting(self).await,
            Ok(Greeting::Probe) => None,
            Err(error) => {
                tracing::error!(%error);
                let _ = self.conn_tx.write_frame(Message::Error { error }).await;
                None
            }
        }
    }

    async fn try_handshake(&mut self) -> Result<Greeting, ProtocolError> {
        let version = match self.conn_rx.read_frame().await? {
            Some(Message::Version { version }) => version,
            Some(Message::Ping) => {
                self.conn_tx
                    .write_frame(Message::Pong {
                        message: PONG.to_owned(),
                    })
                    .await?;
                tracing::debug!("Answered liveness probe");
                return Ok(Greeting::Probe);
            }
            Some(_) => return Err(ProtocolError::HandshakeRequired),
            None => return Err(ProtocolError::Disconnected),
        };

        if version != sketchmatch_lib::VERSION {
            return Err(ProtocolError::VersionMismatch(
                version,
                sketchmatch_lib::VERSION.to_owned(),
            ));
        }

        // Inform the client of their ConnectionId
        self.conn_tx
            .write_frame(Message::ConnectionAccept {
                connection_id: *self.connection_id,
            })
            .await?;
        tracing::info!(
            "New connection {} opened, {} connected",
            self.connection_id,
            self.state.connection_count()
        );
        Ok(Greeting::Play)
    }
}

async fn send_task<W: AsyncWrite + Unpin>(
    mut conn_tx: ConnectionTx<W>,
    mut local_rx: mpsc::Receiver<Message>,
) {
    while let Some(m) = local_rx.recv().await {
        if let Err(e) = conn_tx.write_frame(m).await {
            tracing::error!("Error writing message, Closing connection\n{e:?}");
            return;
        }
    }
}

/// A client past the handshake. Its events go to the hub, and its notifications come back through
/// `local_tx` to a dedicated writer task.
struct PlayerClient<R> {
    hub: HubHandle,
    connection_id: OwnedId,
    conn_rx: ConnectionRx<R>,
    local_tx: mpsc::Sender<Message>,
    _send_task: ChildTask<()>,
}

impl<R: AsyncRead + Unpin + Send + 'static> PlayerClient<R> {
    async fn from_connecting<W>(client: ConnectingClient<R, W>) -> Option<Self>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let send_task = tokio::spawn(send_task(client.conn_tx, rx)).into();
        let hub = client.state.hub_handle(*client.connection_id);
        if let Err(e) = hub.connect(tx.clone()).await {
            tracing::error!(%e, "Unable to reach the hub");
            return None;
        }

        Some(Self {
            hub,
            connection_id: client.connection_id,
            conn_rx: client.conn_rx,
            local_tx: tx,
            _send_task: send_task,
        })
    }

    /// Takes ownership of self to guarantee that client will be dropped when it's
    /// message loop ends
    #[instrument(skip_all, fields(connection_id = %self.connection_id))]
    async fn run(mut self) {
        loop {
            let incoming = match self.conn_rx.read_frame().await {
                Ok(Some(Message::Event(x))) => x,
                Ok(Some(m)) => {
                    tracing::error!("Invalid message received: {m:?}");
                    let _ = self
                        .local_tx
                        .send(Message::Error {
                            error: ProtocolError::InvalidMessage,
                        })
                        .await;
                    continue;
                }
                Ok(None) => {
                    break;
                }
                Err(e) => {
                    tracing::error!("Error reading message, Closing connection\n{e:?}",);
                    break;
                }
            };

            tracing::debug!("Received {} event", incoming.kind());
            match self.process(incoming).await {
                Ok(()) => (),
                // Rejected events are dropped silently, the hub has already counted them
                Err(HubError::Rejected(error)) => tracing::debug!(%error, "Event rejected"),
                Err(HubError::HandleInvalid) => {
                    tracing::error!("Hub is gone, Closing connection");
                    break;
                }
            }
        }
        tracing::info!("Connection closed");

        // The id stays reserved until the hub has our disconnect queued
        let Self { hub, connection_id, .. } = self;
        hub.leave().await;
        drop(connection_id);
    }

    async fn process(&mut self, event: Event) -> HubResult<()> {
        match event {
            Event::DeclareDrawer { display_name } => {
                self.hub.declare(Role::Drawer, display_name).await
            }
            Event::DeclareGuesser { display_name } => {
                self.hub.declare(Role::Guesser, display_name).await
            }
            Event::WordSelected {
                selected_word,
                difficulty,
            } => self.hub.select_word(selected_word, difficulty).await,
            Event::CanvasUpdated { canvas } => self.hub.update_canvas(canvas).await,
            Event::GuessSubmitted { guessing_word } => self.hub.submit_guess(guessing_word).await,
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use sketchmatch_lib::net::connection::{from_split, ConnectionRx, ConnectionTx};
    use sketchmatch_lib::net::{Event, Message, Notification, ProtocolError};
    use sketchmatch_lib::{Difficulty, Role};
    use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};
    use tokio::time::timeout;

    use super::{serve, PONG};
    use crate::hub::start_hub;
    use crate::state::ServerState;

    type TestTx = ConnectionTx<WriteHalf<DuplexStream>>;
    type TestRx = ConnectionRx<ReadHalf<DuplexStream>>;

    /// Open an in-memory connection to a served client and return the client's end.
    fn open(state: &ServerState) -> (TestTx, TestRx) {
        let (client, server) = duplex(64 * 1024);
        let (server_rx, server_tx) = split(server);
        let (conn_tx, conn_rx) = from_split(server_rx, server_tx);
        tokio::spawn(serve(state.clone(), conn_tx, conn_rx));

        let (client_rx, client_tx) = split(client);
        from_split(client_rx, client_tx)
    }

    async fn next(rx: &mut TestRx) -> Message {
        timeout(Duration::from_secs(1), rx.read_frame())
            .await
            .expect("Timed out waiting for a message")
            .unwrap()
            .expect("Connection closed")
    }

    async fn next_notification(rx: &mut TestRx) -> Notification {
        match next(rx).await {
            Message::Notify(envelope) => envelope.notification,
            m => panic!("Expected a notification, got {m:?}"),
        }
    }

    async fn join(state: &ServerState, role: Role, name: &str) -> (TestTx, TestRx) {
        let (mut tx, mut rx) = open(state);
        tx.write_frame(Message::Version {
            version: sketchmatch_lib::VERSION.to_owned(),
        })
        .await
        .unwrap();
        assert!(matches!(next(&mut rx).await, Message::ConnectionAccept { .. }));
        tx.write_frame(Event::declare(role, name).into())
            .await
            .unwrap();
        (tx, rx)
    }

    #[tokio::test]
    async fn liveness_probe() {
        let state = ServerState::new(start_hub());
        let (mut tx, mut rx) = open(&state);

        tx.write_frame(Message::Ping).await.unwrap();
        assert_eq!(
            next(&mut rx).await,
            Message::Pong {
                message: PONG.to_owned()
            }
        );
        // The probe connection is closed right after
        assert!(matches!(rx.read_frame().await, Ok(None)));
    }

    #[tokio::test]
    async fn version_mismatch() {
        let state = ServerState::new(start_hub());
        let (mut tx, mut rx) = open(&state);

        tx.write_frame(Message::Version {
            version: "0.0.0-bogus".to_owned(),
        })
        .await
        .unwrap();
        assert!(matches!(
            next(&mut rx).await,
            Message::Error {
                error: ProtocolError::VersionMismatch(..)
            }
        ));
    }

    #[tokio::test]
    async fn event_before_handshake() {
        let state = ServerState::new(start_hub());
        let (mut tx, mut rx) = open(&state);

        tx.write_frame(Event::declare(Role::Drawer, "pablo").into())
            .await
            .unwrap();
        assert_eq!(
            next(&mut rx).await,
            Message::Error {
                error: ProtocolError::HandshakeRequired
            }
        );
    }

    #[tokio::test]
    async fn full_round() {
        let state = ServerState::new(start_hub());
        let (mut drawer_tx, mut drawer_rx) = join(&state, Role::Drawer, "pablo").await;
        assert_eq!(
            next_notification(&mut drawer_rx).await,
            Notification::WaitingForPlayer
        );

        let (mut guesser_tx, mut guesser_rx) = join(&state, Role::Guesser, "sherlock").await;
        for rx in [&mut drawer_rx, &mut guesser_rx] {
            let Notification::Matched {
                drawer_name,
                guesser_name,
                ..
            } = next_notification(rx).await
            else {
                panic!("Expected a match");
            };
            assert_eq!(drawer_name, "pablo");
            assert_eq!(guesser_name, "sherlock");
        }

        drawer_tx
            .write_frame(
                Event::WordSelected {
                    selected_word: "cat".to_owned(),
                    difficulty: Some(Difficulty::Easy),
                }
                .into(),
            )
            .await
            .unwrap();
        assert_eq!(
            next_notification(&mut drawer_rx).await,
            Notification::GameStarted
        );
        assert_eq!(
            next_notification(&mut guesser_rx).await,
            Notification::GameStarted
        );

        for frame in 0..3u8 {
            drawer_tx
                .write_frame(Event::CanvasUpdated { canvas: vec![frame] }.into())
                .await
                .unwrap();
        }
        for frame in 0..3u8 {
            assert_eq!(
                next_notification(&mut guesser_rx).await,
                Notification::CanvasUpdated {
                    canvas: vec![frame]
                }
            );
        }

        guesser_tx
            .write_frame(
                Event::GuessSubmitted {
                    guessing_word: "dog".to_owned(),
                }
                .into(),
            )
            .await
            .unwrap();
        assert_eq!(
            next_notification(&mut guesser_rx).await,
            Notification::GuessIncorrect
        );

        guesser_tx
            .write_frame(
                Event::GuessSubmitted {
                    guessing_word: "cat".to_owned(),
                }
                .into(),
            )
            .await
            .unwrap();
        for rx in [&mut drawer_rx, &mut guesser_rx] {
            assert!(matches!(
                next_notification(rx).await,
                Notification::GameFinished { points, .. } if points > 0
            ));
        }
    }

    #[tokio::test]
    async fn peer_disconnect_stops_game() {
        let state = ServerState::new(start_hub());
        let (drawer_tx, mut drawer_rx) = join(&state, Role::Drawer, "pablo").await;
        next_notification(&mut drawer_rx).await;
        let (_guesser_tx, mut guesser_rx) = join(&state, Role::Guesser, "sherlock").await;
        next_notification(&mut drawer_rx).await;
        let Notification::Matched { session_id, .. } = next_notification(&mut guesser_rx).await
        else {
            panic!("Expected a match");
        };

        drop(drawer_tx);
        drop(drawer_rx);
        assert_eq!(
            next_notification(&mut guesser_rx).await,
            Notification::GameStopped { session_id }
        );
    }
}

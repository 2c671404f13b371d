//! WebSocket connection actor and the shared channel handle.
//!
//! All transport state — the socket itself, the retry counter, the backoff
//! timer — lives inside a single Tokio task (the *connection actor*).  Every
//! inbound frame is routed and dispatched to completion on that task before
//! the next frame is read, so ordering from wire to subscriber is FIFO by
//! construction and no lock ever guards the transport handle.
//!
//! Consumers never see the actor.  They hold a [`ChannelHandle`]: a cheap,
//! clonable reference carrying the command channel and the shared event
//! dispatcher.  The actor runs for as long as at least one handle exists and
//! exits when the last one is dropped, closing any open socket on the way
//! out.
//!
//! # Command semantics
//!
//! - `connect()` is idempotent: while a dial is in flight or the socket is
//!   open, further connect commands are no-ops.  From the failed state it
//!   re-arms the retry counter and dials again.
//! - `disconnect()` is deliberate: it closes the socket (or aborts an
//!   in-flight dial, or cancels a pending redial) without triggering the
//!   reconnection policy, and reports the closure with a `Manual` cause.
//! - Neither command completes synchronously with the transport; callers
//!   observe the outcome through `connection` events, not return values.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::Message as WsMessage,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use quizlink_core::{
    ChannelEvent, ConnectionEvent, DisconnectCause, Dispatcher, ErrorEvent, FrameRouter,
};

use crate::domain::ChannelConfig;
use crate::infrastructure::reconnect::{ReconnectPolicy, RetryDecision};

/// The concrete stream type `connect_async` yields for `ws://` URLs.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Commands a handle can send to the connection actor.
#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
}

// ── Channel handle ────────────────────────────────────────────────────────────

/// Shared, reference-counted handle to one hub channel.
///
/// Cloning a handle does not open a second connection; every clone commands
/// the same actor and observes the same dispatcher.  The underlying actor
/// (and with it any open socket) shuts down when the last clone is dropped.
///
/// Must be created from within a Tokio runtime, because construction spawns
/// the actor task.
#[derive(Clone)]
pub struct ChannelHandle {
    config: ChannelConfig,
    dispatcher: Arc<Dispatcher>,
    cmd_tx: mpsc::Sender<Command>,
}

impl ChannelHandle {
    /// Spawns a connection actor for `config` and returns the first handle.
    ///
    /// The actor starts idle; no connection is attempted until
    /// [`connect`](Self::connect) is called.
    pub fn new(config: ChannelConfig) -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = ConnectionActor {
            policy: ReconnectPolicy::from_config(&config),
            router: FrameRouter::new(),
            dispatcher: Arc::clone(&dispatcher),
            config: config.clone(),
        };
        tokio::spawn(actor.run(cmd_rx));

        Self {
            config,
            dispatcher,
            cmd_tx,
        }
    }

    /// Asks the actor to open the connection.
    ///
    /// No-op while already connected or connecting; from the failed state it
    /// re-arms the retry counter.  Completion is observable only through the
    /// `connection` event.
    pub async fn connect(&self) {
        // The actor outlives every handle, so a send can only fail after the
        // actor task itself died; there is nothing left to notify then.
        let _ = self.cmd_tx.send(Command::Connect).await;
    }

    /// Asks the actor to close the connection deliberately.
    ///
    /// Short-circuits the reconnection policy: no automatic redial follows,
    /// and no error signal is raised.
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(Command::Disconnect).await;
    }

    /// The event dispatcher shared by every clone of this handle.
    ///
    /// Facades register their subscriptions here; tests can also emit
    /// synthetic events through it directly.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The configuration this channel was created with.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("hub_url", &self.config.hub_url)
            .finish()
    }
}

// ── Connection actor ──────────────────────────────────────────────────────────

/// How one dial attempt ended.
enum DialEnd {
    /// The handshake completed.
    Open(WsStream),
    /// The transport refused or the handshake failed.
    Failed(String),
    /// A disconnect command aborted the attempt.
    Manual,
    /// The last handle was dropped mid-dial.
    Shutdown,
}

/// How a connected session ended.
enum ServeEnd {
    /// The hub dropped us or the transport errored.
    Lost(String),
    /// A disconnect command closed the session.
    Manual,
    /// The last handle was dropped mid-session.
    Shutdown,
}

/// How a backoff wait ended.
enum WaitEnd {
    /// The delay elapsed; redial.
    Elapsed,
    /// An explicit connect arrived; redial immediately with a fresh counter.
    Rearmed,
    /// A disconnect command cancelled the pending redial.
    Manual,
    /// The last handle was dropped mid-wait.
    Shutdown,
}

/// How a whole connect-serve-retry episode ended.
enum EpisodeEnd {
    /// The channel is down (manual disconnect or retry ceiling); the actor
    /// waits for the next command.
    Down,
    /// The actor should exit.
    Shutdown,
}

/// What to do after an unexpected loss was recorded.
enum LossNext {
    Redial,
    Down,
    Shutdown,
}

/// The single owner of the transport and the retry state.
struct ConnectionActor {
    policy: ReconnectPolicy,
    router: FrameRouter,
    dispatcher: Arc<Dispatcher>,
    config: ChannelConfig,
}

impl ConnectionActor {
    /// Actor main loop: idle until commanded, then run connect episodes.
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        loop {
            // Down phase (idle or failed): only commands can wake the channel.
            match cmd_rx.recv().await {
                None => break,
                Some(Command::Disconnect) => continue, // already down
                Some(Command::Connect) => {}
            }

            self.policy.re_arm();
            if let EpisodeEnd::Shutdown = self.run_episode(&mut cmd_rx).await {
                break;
            }
        }
        debug!("last channel handle dropped; connection actor exiting");
    }

    /// One failure episode: dial, serve, and redial until the channel is
    /// deliberately closed, gives up, or the actor shuts down.
    async fn run_episode(&mut self, cmd_rx: &mut mpsc::Receiver<Command>) -> EpisodeEnd {
        loop {
            info!("dialing quiz hub at {}", self.config.hub_url);
            match self.dial(cmd_rx).await {
                DialEnd::Open(ws) => {
                    self.policy.connected();
                    info!("connected to quiz hub at {}", self.config.hub_url);
                    self.emit_connection(true, None);

                    match self.serve(ws, cmd_rx).await {
                        ServeEnd::Manual => {
                            self.policy.manual_disconnect();
                            info!("disconnected from quiz hub (requested)");
                            self.emit_connection(false, Some(DisconnectCause::Manual));
                            return EpisodeEnd::Down;
                        }
                        ServeEnd::Shutdown => return EpisodeEnd::Shutdown,
                        ServeEnd::Lost(reason) => match self.handle_loss(reason, cmd_rx).await {
                            LossNext::Redial => continue,
                            LossNext::Down => return EpisodeEnd::Down,
                            LossNext::Shutdown => return EpisodeEnd::Shutdown,
                        },
                    }
                }
                DialEnd::Failed(reason) => match self.handle_loss(reason, cmd_rx).await {
                    LossNext::Redial => continue,
                    LossNext::Down => return EpisodeEnd::Down,
                    LossNext::Shutdown => return EpisodeEnd::Shutdown,
                },
                DialEnd::Manual => {
                    self.policy.manual_disconnect();
                    info!("connection attempt aborted (requested)");
                    self.emit_connection(false, Some(DisconnectCause::Manual));
                    return EpisodeEnd::Down;
                }
                DialEnd::Shutdown => return EpisodeEnd::Shutdown,
            }
        }
    }

    /// Opens the WebSocket, racing the handshake against incoming commands.
    ///
    /// A disconnect command drops the in-flight handshake future, so a late
    /// open completion for a superseded attempt can never be promoted to a
    /// connected state.
    async fn dial(&mut self, cmd_rx: &mut mpsc::Receiver<Command>) -> DialEnd {
        let url = self.config.hub_url.clone();
        let handshake = connect_async(url);
        tokio::pin!(handshake);

        loop {
            tokio::select! {
                result = &mut handshake => {
                    return match result {
                        Ok((ws, _response)) => DialEnd::Open(ws),
                        Err(e) => DialEnd::Failed(e.to_string()),
                    };
                }
                cmd = cmd_rx.recv() => match cmd {
                    None => return DialEnd::Shutdown,
                    Some(Command::Disconnect) => return DialEnd::Manual,
                    Some(Command::Connect) => {} // already connecting
                },
            }
        }
    }

    /// Pumps frames from an open socket into the dispatcher until the
    /// session ends.
    async fn serve(&mut self, mut ws: WsStream, cmd_rx: &mut mpsc::Receiver<Command>) -> ServeEnd {
        loop {
            tokio::select! {
                frame = ws.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        // Routing and dispatch run to completion here before
                        // the next frame is read: end-to-end FIFO.
                        if let Some(event) = self.router.route(&text) {
                            self.dispatcher.emit(&event);
                        }
                    }
                    Some(Ok(WsMessage::Binary(_))) => {
                        // The hub protocol is JSON text only.
                        warn!("unexpected binary frame from hub (ignored)");
                    }
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {
                        // tungstenite answers pings on our behalf.
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        return ServeEnd::Lost("hub closed the connection".to_string());
                    }
                    Some(Ok(WsMessage::Frame(_))) => {
                        debug!("raw frame from hub (ignored)");
                    }
                    Some(Err(e)) => return ServeEnd::Lost(e.to_string()),
                    None => return ServeEnd::Lost("hub stream ended".to_string()),
                },
                cmd = cmd_rx.recv() => match cmd {
                    None => {
                        let _ = ws.close(None).await;
                        return ServeEnd::Shutdown;
                    }
                    Some(Command::Disconnect) => {
                        let _ = ws.close(None).await;
                        return ServeEnd::Manual;
                    }
                    Some(Command::Connect) => {} // already connected
                },
            }
        }
    }

    /// Records an unexpected loss with the policy and either waits out the
    /// backoff delay or surfaces the terminal error.
    async fn handle_loss(
        &mut self,
        reason: String,
        cmd_rx: &mut mpsc::Receiver<Command>,
    ) -> LossNext {
        match self.policy.connection_lost() {
            RetryDecision::Retry { delay, attempt } => {
                warn!(
                    "connection lost ({reason}); redial {attempt}/{} in {delay:?}",
                    self.config.max_reconnect_attempts
                );
                self.emit_connection(false, Some(DisconnectCause::Lost(reason)));

                match self.wait_backoff(delay, cmd_rx).await {
                    WaitEnd::Elapsed => LossNext::Redial,
                    WaitEnd::Rearmed => {
                        self.policy.re_arm();
                        LossNext::Redial
                    }
                    WaitEnd::Manual => {
                        self.policy.manual_disconnect();
                        info!("pending redial cancelled (requested)");
                        self.emit_connection(false, Some(DisconnectCause::Manual));
                        LossNext::Down
                    }
                    WaitEnd::Shutdown => LossNext::Shutdown,
                }
            }
            RetryDecision::GiveUp { attempts } => {
                warn!("connection lost ({reason}); giving up after {attempts} attempt(s)");
                self.emit_connection(false, Some(DisconnectCause::Lost(reason.clone())));
                self.emit_error(format!(
                    "connection lost and not recovered after {attempts} attempt(s): {reason}"
                ));
                LossNext::Down
            }
        }
    }

    /// Sleeps the backoff delay, still answering commands.
    async fn wait_backoff(
        &mut self,
        delay: std::time::Duration,
        cmd_rx: &mut mpsc::Receiver<Command>,
    ) -> WaitEnd {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return WaitEnd::Elapsed,
                cmd = cmd_rx.recv() => match cmd {
                    None => return WaitEnd::Shutdown,
                    Some(Command::Disconnect) => return WaitEnd::Manual,
                    // An explicit connect skips the rest of the delay and
                    // restarts the episode with a zeroed counter.
                    Some(Command::Connect) => return WaitEnd::Rearmed,
                },
            }
        }
    }

    fn emit_connection(&self, connected: bool, cause: Option<DisconnectCause>) {
        self.dispatcher.emit(&ChannelEvent::Connection(ConnectionEvent {
            connected,
            cause,
            reconnect_attempts: self.policy.attempts(),
        }));
    }

    fn emit_error(&self, message: String) {
        self.dispatcher
            .emit(&ChannelEvent::Error(ErrorEvent { message }));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use quizlink_core::EventKind;
    use std::time::Duration;

    fn dead_end_config(port: u16) -> ChannelConfig {
        ChannelConfig {
            hub_url: format!("ws://127.0.0.1:{port}/ws"),
            max_reconnect_attempts: 0,
            reconnect_initial_delay: Duration::from_millis(10),
            reconnect_max_delay: Duration::from_millis(10),
        }
    }

    /// Reserves a local port that has no listener behind it.
    async fn unused_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[tokio::test]
    async fn test_cloned_handles_share_one_dispatcher() {
        let handle = ChannelHandle::new(ChannelConfig::default());
        let clone = handle.clone();
        assert!(
            Arc::ptr_eq(handle.dispatcher(), clone.dispatcher()),
            "clones must observe the same registry"
        );
    }

    #[tokio::test]
    async fn test_handle_exposes_its_config() {
        let config = dead_end_config(1);
        let handle = ChannelHandle::new(config.clone());
        assert_eq!(handle.config().hub_url, config.hub_url);
        assert_eq!(handle.config().max_reconnect_attempts, 0);
    }

    #[tokio::test]
    async fn test_dial_failure_with_zero_ceiling_surfaces_terminal_error() {
        let port = unused_port().await;
        let handle = ChannelHandle::new(dead_end_config(port));

        let (error_tx, mut error_rx) = mpsc::channel(1);
        handle.dispatcher().on(EventKind::Error, move |_| {
            let _ = error_tx.try_send(());
        });

        handle.connect().await;

        tokio::time::timeout(Duration::from_secs(5), error_rx.recv())
            .await
            .expect("terminal error must be emitted before the timeout")
            .expect("dispatcher channel must stay open");
    }

    #[tokio::test]
    async fn test_disconnect_while_idle_is_a_no_op() {
        let port = unused_port().await;
        let handle = ChannelHandle::new(dead_end_config(port));

        // The actor is idle; a disconnect must neither dial nor emit.
        let (conn_tx, mut conn_rx) = mpsc::channel(4);
        handle.dispatcher().on(EventKind::Connection, move |_| {
            let _ = conn_tx.try_send(());
        });

        handle.disconnect().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(
            conn_rx.try_recv().is_err(),
            "no connection event may follow a disconnect from idle"
        );
    }
}

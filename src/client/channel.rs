//! Resilient socket channel
//!
//! [`ChannelManager::connect`] spawns a supervising task that owns the socket
//! and hands back a [`ConnectionHandle`] right away. The supervisor opens a
//! brand-new connection at startup and again every time the current one
//! closes, with no backoff and never more than one attempt in flight.
//!
//! Outbound messages are latest-value telemetry: anything sent while the
//! connection is not open is dropped, and nothing queued for one connection is
//! ever replayed on the next.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::client::endpoint::socket_endpoint;
use crate::config::ClientConfig;
use crate::error::ChannelError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of the current connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// What happened to a sent message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the open connection
    Queued,
    /// Discarded because no connection was open or its queue was full
    Dropped,
}

/// Counters shared by the supervisor and every handle
#[derive(Debug, Default)]
pub struct ChannelStats {
    attempts: AtomicU64,
    opens: AtomicU64,
    dropped: AtomicU64,
    received: AtomicU64,
    /// Bumped every time a connection opens; outbound frames carry the value
    /// they were sent under
    generation: AtomicU64,
}

/// Tunables of a channel
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Abandon a connection attempt after this long; `None` waits forever
    pub connect_timeout: Option<Duration>,
    pub inbound_capacity: usize,
    pub outgoing_capacity: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl ChannelSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: (config.connect_timeout_ms > 0)
                .then(|| Duration::from_millis(config.connect_timeout_ms)),
            inbound_capacity: config.inbound_capacity.max(1),
            outgoing_capacity: config.outgoing_capacity.max(1),
        }
    }
}

/// Creates the channel to one backend endpoint
pub struct ChannelManager {
    endpoint: Url,
    settings: ChannelSettings,
}

/// Outbound text frame tagged with the connection it was sent to
type Outgoing = (u64, String);

/// A connected channel: the handle, the stream of inbound text frames, and
/// the supervising task
pub struct Channel {
    pub handle: ConnectionHandle,
    pub inbound: mpsc::Receiver<String>,
    pub task: JoinHandle<()>,
}

impl ChannelManager {
    /// Derive the endpoint from a page origin
    pub fn new(origin: &str, settings: ChannelSettings) -> Result<Self, ChannelError> {
        Ok(Self {
            endpoint: socket_endpoint(origin)?,
            settings,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Start the supervisor and return without waiting for the connection.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(self) -> Channel {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (close_tx, close_rx) = watch::channel(false);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(self.settings.outgoing_capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.settings.inbound_capacity);
        let stats = Arc::new(ChannelStats::default());

        let supervisor = Supervisor {
            endpoint: self.endpoint,
            connect_timeout: self.settings.connect_timeout,
            state: state_tx,
            outgoing: outgoing_rx,
            inbound: inbound_tx,
            stats: Arc::clone(&stats),
            close: close_rx,
        };
        let task = tokio::spawn(supervisor.run());

        Channel {
            handle: ConnectionHandle {
                state: state_rx,
                outgoing: outgoing_tx,
                stats,
                close: Arc::new(close_tx),
            },
            inbound: inbound_rx,
            task,
        }
    }
}

/// Cheap, cloneable access to the channel.
///
/// The handle stays valid across reconnects; only the state it observes
/// changes.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    state: watch::Receiver<ConnectionState>,
    outgoing: mpsc::Sender<Outgoing>,
    stats: Arc<ChannelStats>,
    close: Arc<watch::Sender<bool>>,
}

impl ConnectionHandle {
    /// Serialize `message` to a JSON text frame and hand it to the open
    /// connection without waiting for delivery
    pub fn send<T: Serialize>(&self, message: &T) -> Result<SendOutcome, ChannelError> {
        // Read before the state so a frame can never be tagged with a
        // connection that opened after the check.
        let generation = self.stats.generation.load(Ordering::Acquire);
        if self.state() != ConnectionState::Open {
            return Ok(self.dropped("connection not open"));
        }

        let text = serde_json::to_string(message).map_err(|e| ChannelError::Encode(e.to_string()))?;

        match self.outgoing.try_send((generation, text)) {
            Ok(()) => Ok(SendOutcome::Queued),
            Err(TrySendError::Full(_)) => Ok(self.dropped("outgoing queue full")),
            Err(TrySendError::Closed(_)) => Ok(self.dropped("channel stopped")),
        }
    }

    fn dropped(&self, reason: &str) -> SendOutcome {
        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        debug!("Dropping outbound message: {}", reason);
        SendOutcome::Dropped
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Wait until the connection reaches `target`; `false` if the supervisor
    /// stopped first
    pub async fn wait_for(&self, target: ConnectionState) -> bool {
        let mut state = self.state.clone();
        let reached = state.wait_for(|s| *s == target).await.is_ok();
        reached
    }

    /// Stop the supervisor, closing the current connection
    pub fn close(&self) {
        self.close.send_replace(true);
    }

    /// Connection attempts started so far
    pub fn attempts(&self) -> u64 {
        self.stats.attempts.load(Ordering::Relaxed)
    }

    /// Connections that reached Open
    pub fn opens(&self) -> u64 {
        self.stats.opens.load(Ordering::Relaxed)
    }

    /// Outbound messages dropped
    pub fn dropped_count(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }

    /// Inbound text frames received
    pub fn received(&self) -> u64 {
        self.stats.received.load(Ordering::Relaxed)
    }
}

struct Supervisor {
    endpoint: Url,
    connect_timeout: Option<Duration>,
    state: watch::Sender<ConnectionState>,
    outgoing: mpsc::Receiver<Outgoing>,
    inbound: mpsc::Sender<String>,
    stats: Arc<ChannelStats>,
    close: watch::Receiver<bool>,
}

impl Supervisor {
    async fn run(mut self) {
        loop {
            if *self.close.borrow() {
                break;
            }

            // Frames queued for the previous connection are stale.
            while self.outgoing.try_recv().is_ok() {}

            self.state.send_replace(ConnectionState::Connecting);
            self.stats.attempts.fetch_add(1, Ordering::Relaxed);
            debug!("Connecting to {}", self.endpoint);

            let attempt = tokio::select! {
                result = open(&self.endpoint, self.connect_timeout) => result,
                _ = self.close.changed() => break,
            };

            let socket = match attempt {
                Ok(socket) => socket,
                Err(e) => {
                    error!("Socket error: {}", e);
                    self.state.send_replace(ConnectionState::Closed);
                    continue;
                }
            };

            self.stats.opens.fetch_add(1, Ordering::Relaxed);
            let generation = self.stats.generation.fetch_add(1, Ordering::AcqRel) + 1;
            self.state.send_replace(ConnectionState::Open);
            info!("Connected to {}", self.endpoint);

            let reconnect = self.pump(socket, generation).await;

            self.state.send_replace(ConnectionState::Closed);
            info!("Disconnected from {}", self.endpoint);

            if !reconnect {
                break;
            }
        }

        self.state.send_replace(ConnectionState::Closed);
        debug!("Channel supervisor stopped");
    }

    /// Move frames both ways until the connection ends. Returns `false` when
    /// the channel itself should stop.
    async fn pump(&mut self, socket: Socket, generation: u64) -> bool {
        let (mut write, mut read) = socket.split();

        loop {
            tokio::select! {
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => self.deliver(text),
                    Some(Ok(Message::Close(frame))) => {
                        debug!("Close frame received: {:?}", frame);
                        return true;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Socket error: {}", e);
                        return true;
                    }
                    None => return true,
                },
                outgoing = self.outgoing.recv() => match outgoing {
                    Some((sent_under, _)) if sent_under != generation => {
                        debug!("Discarding frame queued for an earlier connection");
                    }
                    Some((_, text)) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            error!("Socket error: {}", e);
                            return true;
                        }
                    }
                    None => {
                        debug!("All connection handles dropped");
                        let _ = write.send(Message::Close(None)).await;
                        return false;
                    }
                },
                _ = self.close.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return false;
                }
            }
        }
    }

    fn deliver(&self, text: String) {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        match self.inbound.try_send(text) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Inbound queue full, dropping message"),
            Err(TrySendError::Closed(_)) => debug!("Inbound receiver gone, dropping message"),
        }
    }
}

async fn open(endpoint: &Url, timeout: Option<Duration>) -> Result<Socket, ChannelError> {
    let attempt = tokio_tungstenite::connect_async(endpoint.as_str());

    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| ChannelError::ConnectTimeout(limit.as_millis() as u64))?,
        None => attempt.await,
    };

    let (socket, _response) = result.map_err(|e| ChannelError::Connect(e.to_string()))?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let settings = ChannelSettings::default();
        assert!(settings.connect_timeout.is_none());

        let config = ClientConfig {
            connect_timeout_ms: 1500,
            ..ClientConfig::default()
        };
        let settings = ChannelSettings::from_config(&config);
        assert_eq!(settings.connect_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_manager_rejects_bad_origin() {
        assert!(ChannelManager::new("file:///tmp/index.html", ChannelSettings::default()).is_err());
    }

    #[tokio::test]
    async fn test_send_while_not_open_is_dropped() {
        // Reserve a port, then free it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let manager =
            ChannelManager::new(&format!("http://127.0.0.1:{}", port), ChannelSettings::default())
                .unwrap();
        assert_eq!(manager.endpoint().path(), "/ws");

        let channel = manager.connect();
        let handle = channel.handle.clone();

        let outcome = handle.send(&serde_json::json!({"MIDIOut": ""})).unwrap();
        assert_eq!(outcome, SendOutcome::Dropped);
        assert_eq!(handle.dropped_count(), 1);
        assert_eq!(handle.opens(), 0);

        handle.close();
        channel.task.await.unwrap();
        assert_eq!(handle.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_frames_from_earlier_connection_are_discarded() {
        use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
        use axum::extract::State;
        use axum::response::IntoResponse;
        use axum::routing::get;

        async fn record(
            ws: WebSocketUpgrade,
            State(seen): State<mpsc::UnboundedSender<String>>,
        ) -> impl IntoResponse {
            ws.on_upgrade(move |mut socket| async move {
                while let Some(Ok(message)) = socket.recv().await {
                    if let WsMessage::Text(text) = message {
                        let _ = seen.send(text);
                    }
                }
            })
        }

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let app = axum::Router::new()
            .route("/ws", get(record))
            .with_state(seen_tx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let channel = ChannelManager::new(&format!("http://{}", addr), ChannelSettings::default())
            .unwrap()
            .connect();
        let handle = channel.handle.clone();
        tokio::time::timeout(Duration::from_secs(5), handle.wait_for(ConnectionState::Open))
            .await
            .unwrap();

        // A frame that lost the race with a reconnect still carries the old tag
        let stale = handle.stats.generation.load(Ordering::Acquire) - 1;
        handle
            .outgoing
            .try_send((stale, r#"{"MIDIOut":"stale"}"#.to_string()))
            .unwrap();
        assert_eq!(
            handle.send(&serde_json::json!({"MIDIOut": "fresh"})).unwrap(),
            SendOutcome::Queued
        );

        let first = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, r#"{"MIDIOut":"fresh"}"#);

        handle.close();
        channel.task.await.unwrap();
    }
}

//! WebSocket connection handles.
//!
//! A [`Connection`] owns the receive half of one upgraded socket and is
//! driven by exactly one task. The send half lives behind an async mutex
//! shared with every [`ConnectionSender`] cloned from it, so frames written
//! by other tasks (broadcast fan-out) are serialized with the connection's
//! own writes.
//!
//! Lifecycle state is shared as well:
//!
//! ```text
//! Open ──(close frame / error / end of stream / close())──► Closing ──► Closed
//! ```
//!
//! Once a connection has left `Open`, sends fail with
//! [`WsError::ConnectionClosed`] and `recv` yields `None`.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::ConnectionConfig;
use crate::error::{CloseCode, WsError, WsResult};
use crate::message::Frame;

/// A unique identifier for a relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new time-ordered connection ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Frames may be sent and received.
    Open,
    /// The close handshake has started; no more frames are sent.
    Closing,
    /// The transport has been released.
    Closed,
}

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            OPEN => Self::Open,
            CLOSING => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

type Sink<S> = SplitSink<WebSocketStream<S>, tungstenite::Message>;

/// State shared between a connection and all of its senders.
struct Shared<S> {
    id: ConnectionId,
    state: AtomicU8,
    released: AtomicBool,
    sink: Mutex<Sink<S>>,
}

impl<S> Shared<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Open -> Closing. Returns `true` if this call made the transition.
    fn begin_closing(&self) -> bool {
        self.state
            .compare_exchange(OPEN, CLOSING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    async fn send(&self, frame: Frame) -> WsResult<()> {
        if self.state() != ConnectionState::Open {
            return Err(WsError::connection_closed("connection is not open"));
        }

        let mut sink = self.sink.lock().await;
        sink.send(tungstenite::Message::from(frame))
            .await
            .map_err(send_error)
    }

    async fn close(&self, code: CloseCode, reason: String) -> WsResult<()> {
        // Only the first caller releases the transport.
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let was_open = self.begin_closing();
        let mut sink = self.sink.lock().await;

        let mut result = Ok(());
        if was_open {
            debug!(connection_id = %self.id, code = code.as_u16(), reason = %reason, "Sending close frame");
            result = sink
                .send(tungstenite::Message::from(Frame::close(code, reason)))
                .await
                .map_err(send_error);
        }

        if let Err(e) = sink.close().await {
            debug!(connection_id = %self.id, error = %e, "Transport already released");
        }

        self.state.store(CLOSED, Ordering::SeqCst);
        result
    }
}

fn send_error(err: tungstenite::Error) -> WsError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            WsError::connection_closed(err.to_string())
        }
        other => WsError::send_failed(other.to_string()),
    }
}

/// A server-side WebSocket connection.
///
/// # Example
///
/// ```ignore
/// use hermes_ws::{Connection, ConnectionConfig, Frame};
///
/// let mut conn = Connection::from_raw_socket(stream, &ConnectionConfig::default()).await;
/// while let Some(frame) = conn.recv().await {
///     match frame {
///         Ok(Frame::Text(text)) => conn.send_text(text).await?,
///         Ok(Frame::Close(_)) | Err(_) => break,
///         Ok(_) => {}
///     }
/// }
/// conn.close(CloseCode::Normal, "bye").await?;
/// ```
pub struct Connection<S = tokio::net::TcpStream> {
    shared: Arc<Shared<S>>,
    receiver: SplitStream<WebSocketStream<S>>,
    connected_at: Instant,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an established WebSocket stream.
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self::with_id(stream, ConnectionId::new())
    }

    /// Wrap an established WebSocket stream under a known connection ID.
    pub fn with_id(stream: WebSocketStream<S>, id: ConnectionId) -> Self {
        let (sink, receiver) = stream.split();
        Self {
            shared: Arc::new(Shared {
                id,
                state: AtomicU8::new(OPEN),
                released: AtomicBool::new(false),
                sink: Mutex::new(sink),
            }),
            receiver,
            connected_at: Instant::now(),
        }
    }

    /// Wrap a raw, already-upgraded byte stream as the server role.
    ///
    /// The HTTP handshake must have completed before this is called.
    pub async fn from_raw_socket(stream: S, config: &ConnectionConfig) -> Self {
        let ws = WebSocketStream::from_raw_socket(
            stream,
            tungstenite::protocol::Role::Server,
            Some(config.to_protocol_config()),
        )
        .await;
        Self::new(ws)
    }

    /// Get the connection ID.
    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Check if the connection has been fully closed.
    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// How long this connection has been open.
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Receive the next frame.
    ///
    /// Returns `None` at end of stream, and for every call after the
    /// connection has left the `Open` state. Pings are answered by the
    /// protocol layer; they are still surfaced here.
    #[instrument(skip(self), fields(connection_id = %self.shared.id))]
    pub async fn recv(&mut self) -> Option<WsResult<Frame>> {
        if self.state() != ConnectionState::Open {
            return None;
        }

        match self.receiver.next().await {
            Some(Ok(msg)) => {
                let frame = Frame::from(msg);
                if frame.is_close() {
                    debug!("Received close frame");
                    self.shared.begin_closing();
                }
                Some(Ok(frame))
            }
            Some(Err(e)) => {
                self.shared.begin_closing();
                Some(Err(WsError::from(e)))
            }
            None => {
                self.shared.begin_closing();
                None
            }
        }
    }

    /// Send a frame.
    pub async fn send(&self, frame: Frame) -> WsResult<()> {
        self.shared.send(frame).await
    }

    /// Send a text frame.
    pub async fn send_text(&self, text: impl Into<String>) -> WsResult<()> {
        self.shared.send(Frame::text(text)).await
    }

    /// Close the connection.
    ///
    /// Sends a close frame if the connection is still open, then releases the
    /// transport. Safe to call repeatedly and concurrently with
    /// [`ConnectionSender::close`]; only the first call does any work.
    pub async fn close(&self, code: CloseCode, reason: impl Into<String>) -> WsResult<()> {
        self.shared.close(code, reason.into()).await
    }

    /// Get a handle that can send to this connection from other tasks.
    pub fn sender(&self) -> ConnectionSender<S> {
        ConnectionSender {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// A cloneable handle for writing to a connection from other tasks.
pub struct ConnectionSender<S = tokio::net::TcpStream> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for ConnectionSender<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> std::fmt::Debug for ConnectionSender<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSender")
            .field("connection_id", &self.shared.id)
            .finish_non_exhaustive()
    }
}

impl<S> ConnectionSender<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Get the connection ID.
    pub fn connection_id(&self) -> ConnectionId {
        self.shared.id
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Send a frame.
    pub async fn send(&self, frame: Frame) -> WsResult<()> {
        self.shared.send(frame).await
    }

    /// Send a text frame.
    pub async fn send_text(&self, text: impl Into<String>) -> WsResult<()> {
        self.shared.send(Frame::text(text)).await
    }

    /// Close the connection. See [`Connection::close`].
    pub async fn close(&self, code: CloseCode, reason: impl Into<String>) -> WsResult<()> {
        self.shared.close(code, reason.into()).await
    }
}

//! Error types for the WebSocket transport.
//!
//! These cover the upgrade handshake, the receive path and the send path of
//! a single connection. Nothing here knows about topics or commands.

use thiserror::Error;

/// Result type for transport operations.
pub type WsResult<T> = Result<T, WsError>;

/// Errors raised by a WebSocket connection or its handshake.
#[derive(Debug, Error)]
pub enum WsError {
    /// The HTTP request was not a valid WebSocket upgrade request.
    #[error("not a WebSocket upgrade request: {reason}")]
    NotWebSocketRequest {
        /// Which part of the upgrade request was missing or wrong.
        reason: String,
    },

    /// The connection is no longer open for writing.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closing.
        reason: String,
    },

    /// The transport refused an outbound frame.
    #[error("failed to send frame: {0}")]
    SendFailed(String),

    /// An outbound frame was not accepted within the send deadline.
    #[error("send timed out after {0:?}")]
    SendTimeout(std::time::Duration),

    /// The inbound side of the transport failed.
    #[error("failed to receive frame: {0}")]
    ReceiveFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WsError {
    /// Create a new "not a WebSocket request" error.
    pub fn not_websocket(reason: impl Into<String>) -> Self {
        Self::NotWebSocketRequest {
            reason: reason.into(),
        }
    }

    /// Create a new connection closed error.
    pub fn connection_closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }

    /// Create a new send failed error.
    pub fn send_failed(reason: impl Into<String>) -> Self {
        Self::SendFailed(reason.into())
    }

    /// Create a new receive failed error.
    pub fn receive_failed(reason: impl Into<String>) -> Self {
        Self::ReceiveFailed(reason.into())
    }
}

impl From<tungstenite::Error> for WsError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::connection_closed(err.to_string())
            }
            tungstenite::Error::Io(io) => Self::Io(io),
            other => Self::receive_failed(other.to_string()),
        }
    }
}

/// Close codes the relay sends (RFC 6455 section 7.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CloseCode {
    /// The peer left or the stream ended (1000).
    Normal = 1000,
    /// The server is shutting down (1001).
    GoingAway = 1001,
    /// The receive path failed (1002).
    Protocol = 1002,
}

impl CloseCode {
    /// The numeric code carried in the close frame.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

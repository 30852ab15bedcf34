//! WebSocket transport for the Hermes relay.
//!
//! This crate knows nothing about topics. It provides:
//!
//! - the HTTP upgrade [`handshake`] (validation, accept key, responses)
//! - [`Connection`], a server-side socket driven by one task, plus the
//!   cloneable [`ConnectionSender`] other tasks use to write to it
//! - [`Frame`], the frame type surfaced to the dispatcher
//! - [`ConnectionConfig`], per-connection protocol limits
//!
//! # Example
//!
//! ```ignore
//! use hermes_ws::{handshake, CloseCode, Connection, ConnectionConfig, Frame};
//!
//! let upgrade = handshake::prepare_upgrade(&request);
//! if !upgrade.success {
//!     return upgrade.response;
//! }
//! // ... write the 101 response, then on the upgraded stream:
//! let mut conn = Connection::from_raw_socket(io, &ConnectionConfig::default()).await;
//! while let Some(Ok(frame)) = conn.recv().await {
//!     if let Frame::Text(text) = frame {
//!         conn.send_text(text).await?;
//!     }
//! }
//! conn.close(CloseCode::Normal, "").await?;
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! HTTP request ──► prepare_upgrade() ──► 101 ──► Connection::from_raw_socket()
//!                        │
//!                        └──► 400 (not an upgrade)
//!
//! Connection: Open ──► Closing ──► Closed
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod handshake;
pub mod message;

pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionId, ConnectionSender, ConnectionState};
pub use error::{CloseCode, WsError, WsResult};
pub use handshake::{is_websocket_request, prepare_upgrade, WebSocketUpgrade};
pub use message::{CloseFrame, Frame};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports() {
        let _config = ConnectionConfig::default();
        let _id = ConnectionId::new();
        let _frame = Frame::text("hello");
        let _close = CloseCode::Normal;
    }
}

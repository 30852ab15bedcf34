//! The send side of a subscriber, as seen by the registry and fan-out.

use std::future::Future;

use hermes_ws::{ConnectionId, ConnectionSender, WsResult};
use tokio::io::{AsyncRead, AsyncWrite};

/// A handle the broker can deliver text frames to.
///
/// Implemented for [`ConnectionSender`]. The registry stores clones of these
/// keyed by [`Outbound::id`], so two handles with the same ID are the same
/// subscriber.
pub trait Outbound: Clone + Send + Sync + 'static {
    /// Identity of the connection behind this handle.
    fn id(&self) -> ConnectionId;

    /// Send one text frame.
    fn send_text(&self, text: String) -> impl Future<Output = WsResult<()>> + Send;
}

impl<S> Outbound for ConnectionSender<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn id(&self) -> ConnectionId {
        self.connection_id()
    }

    fn send_text(&self, text: String) -> impl Future<Output = WsResult<()>> + Send {
        ConnectionSender::send_text(self, text)
    }
}

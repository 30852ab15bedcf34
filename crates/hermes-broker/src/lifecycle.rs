//! Connection teardown.
//!
//! A connection leaves the registry exactly once, however its session ends.
//! [`Registration`] ties that removal to a value owned by the session: an
//! orderly exit calls [`teardown`], and a cancelled or panicking session
//! still removes its subscriptions when the registration is dropped.

use std::fmt;

use hermes_ws::{CloseCode, Connection, ConnectionId, ConnectionSender};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::broker::Broker;
use crate::outbound::Outbound;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// The peer sent a close frame.
    PeerClosed,
    /// The stream ended without a close frame.
    EndOfStream,
    /// Receiving failed.
    TransportError,
    /// The server is shutting down.
    Shutdown,
}

impl TeardownReason {
    /// Close code sent to the peer, if the connection is still open.
    pub fn close_code(self) -> CloseCode {
        match self {
            Self::PeerClosed | Self::EndOfStream => CloseCode::Normal,
            Self::TransportError => CloseCode::Protocol,
            Self::Shutdown => CloseCode::GoingAway,
        }
    }

    /// Close reason text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer closed",
            Self::EndOfStream => "end of stream",
            Self::TransportError => "transport error",
            Self::Shutdown => "server shutting down",
        }
    }
}

impl fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Removes a connection from every topic when released or dropped.
pub struct Registration<O: Outbound> {
    broker: Broker<O>,
    id: ConnectionId,
    released: bool,
}

impl<O: Outbound> Registration<O> {
    /// Bind connection `id` to `broker`.
    pub fn new(broker: Broker<O>, id: ConnectionId) -> Self {
        Self {
            broker,
            id,
            released: false,
        }
    }

    /// The connection this registration belongs to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remove the connection from every topic.
    ///
    /// Only the first call does anything. Returns the number of topics the
    /// connection was removed from.
    pub fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        self.released = true;
        self.broker.registry().remove_everywhere(self.id)
    }
}

impl<O: Outbound> Drop for Registration<O> {
    fn drop(&mut self) {
        if !self.released {
            let removed = self.release();
            debug!(connection_id = %self.id, removed, "Subscriptions removed on drop");
        }
    }
}

/// Run the teardown sequence for one connection.
///
/// Registry removal comes before the close frame, not after it: a close
/// handshake can stall on a slow peer, and until removal the connection would
/// still be picked as a publish recipient. The transport is then closed with
/// the code for `reason`. Close failures are logged, never returned.
pub async fn teardown<S>(
    connection: &Connection<S>,
    registration: &mut Registration<ConnectionSender<S>>,
    reason: TeardownReason,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let removed = registration.release();

    if let Err(e) = connection.close(reason.close_code(), reason.as_str()).await {
        debug!(connection_id = %connection.id(), error = %e, "Close handshake failed");
    }

    info!(
        connection_id = %connection.id(),
        reason = %reason,
        topics_removed = removed,
        duration_ms = u64::try_from(connection.connection_duration().as_millis()).unwrap_or(u64::MAX),
        "Connection closed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingOutbound;
    use hermes_ws::ConnectionConfig;
    use std::time::Duration;
    use tokio::io::DuplexStream;

    #[test]
    fn test_close_codes() {
        assert_eq!(TeardownReason::Shutdown.close_code(), CloseCode::GoingAway);
        assert_eq!(TeardownReason::PeerClosed.close_code(), CloseCode::Normal);
        assert_eq!(TeardownReason::TransportError.close_code(), CloseCode::Protocol);
        assert_eq!(TeardownReason::Shutdown.to_string(), "server shutting down");
    }

    #[test]
    fn test_release_runs_once() {
        let broker: Broker<RecordingOutbound> = Broker::default();
        let (a, _ra) = RecordingOutbound::new();
        broker.registry().subscribe("news", a.clone());
        broker.registry().subscribe("sports", a.clone());

        let mut registration = Registration::new(broker.clone(), a.id());
        assert_eq!(registration.release(), 2);
        assert_eq!(registration.release(), 0);

        // Re-subscribing after release is not undone by the drop.
        broker.registry().subscribe("news", a.clone());
        drop(registration);
        assert!(broker.registry().is_subscribed("news", a.id()));
    }

    #[test]
    fn test_drop_removes_subscriptions() {
        let broker: Broker<RecordingOutbound> = Broker::default();
        let (a, _ra) = RecordingOutbound::new();
        let (b, _rb) = RecordingOutbound::new();
        broker.registry().subscribe("news", a.clone());
        broker.registry().subscribe("news", b.clone());

        drop(Registration::new(broker.clone(), a.id()));

        assert!(!broker.registry().is_subscribed("news", a.id()));
        assert!(broker.registry().is_subscribed("news", b.id()));
    }

    #[tokio::test]
    async fn test_cancelled_task_still_cleans_up() {
        let broker: Broker<RecordingOutbound> = Broker::default();
        let (a, _ra) = RecordingOutbound::new();
        broker.registry().subscribe("news", a.clone());

        let registration = Registration::new(broker.clone(), a.id());
        let task = tokio::spawn(async move {
            let _registration = registration;
            std::future::pending::<()>().await;
        });
        task.abort();
        let _ = task.await;

        assert!(!broker.registry().has_subscribers("news"));
    }

    #[tokio::test]
    async fn test_teardown_removes_before_close_frame_is_written() {
        // A one-byte pipe the peer never reads: the close frame cannot be flushed.
        let (server_io, _peer_io) = tokio::io::duplex(1);
        let connection = Connection::from_raw_socket(server_io, &ConnectionConfig::default()).await;
        let broker: Broker<ConnectionSender<DuplexStream>> = Broker::default();
        broker.registry().subscribe("news", connection.sender());
        let mut registration = Registration::new(broker.clone(), connection.id());

        let stalled = tokio::time::timeout(
            Duration::from_millis(100),
            teardown(&connection, &mut registration, TeardownReason::Shutdown),
        )
        .await;

        assert!(stalled.is_err(), "close should still be waiting on the peer");
        assert!(!broker.registry().has_subscribers("news"));
    }
}

//! Per-connection command dispatch.
//!
//! A [`Session`] owns one [`Connection`] for its whole life. It reads frames
//! in order, applies each command fully before reading the next, and ends
//! with the teardown sequence on every exit path.
//!
//! ```text
//! recv() ──► Text ──► decode ──► Subscribe   ──► registry.subscribe
//!   │                   │        Unsubscribe ──► registry.unsubscribe
//!   │                   │        Publish     ──► broadcast (originator = self)
//!   │                   └─► malformed: log, drop, keep reading
//!   └─► Close / error / end of stream / shutdown ──► teardown
//! ```

use std::future::Future;

use hermes_telemetry::{metrics, relay_event};
use hermes_ws::{Connection, ConnectionId, ConnectionSender, Frame};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, instrument, trace, warn};

use crate::broker::Broker;
use crate::codec::{self, Command};
use crate::lifecycle::{self, Registration, TeardownReason};

/// Drives one connection until it closes.
pub struct Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    connection: Connection<S>,
    sender: ConnectionSender<S>,
    broker: Broker<ConnectionSender<S>>,
    registration: Registration<ConnectionSender<S>>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Create a session for `connection` on `broker`.
    ///
    /// From here on the connection is removed from every topic when the
    /// session ends, even if its future is dropped.
    pub fn new(connection: Connection<S>, broker: Broker<ConnectionSender<S>>) -> Self {
        let sender = connection.sender();
        let registration = Registration::new(broker.clone(), connection.id());
        Self {
            connection,
            sender,
            broker,
            registration,
        }
    }

    /// The connection this session drives.
    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Process frames until the peer leaves, the transport fails or
    /// `shutdown` completes, then tear the connection down.
    #[instrument(skip_all, fields(connection_id = %self.connection.id()))]
    pub async fn run<F>(mut self, shutdown: F) -> TeardownReason
    where
        F: Future<Output = ()>,
    {
        let _active = metrics::ConnectionGuard::new();
        debug!("Session started");

        tokio::pin!(shutdown);
        let reason = loop {
            let next = tokio::select! {
                biased;
                () = &mut shutdown => break TeardownReason::Shutdown,
                next = self.connection.recv() => next,
            };

            match next {
                None => break TeardownReason::EndOfStream,
                Some(Err(e)) => {
                    warn!(error = %e, "Receive failed");
                    break TeardownReason::TransportError;
                }
                Some(Ok(Frame::Close(_))) => break TeardownReason::PeerClosed,
                Some(Ok(Frame::Text(text))) => self.handle_text(&text).await,
                Some(Ok(Frame::Binary(data))) => {
                    debug!(bytes = data.len(), "Ignoring binary frame");
                }
                Some(Ok(frame @ (Frame::Ping(_) | Frame::Pong(_)))) => {
                    trace!(kind = frame.kind(), "Control frame");
                }
            }
        };

        lifecycle::teardown(&self.connection, &mut self.registration, reason).await;
        reason
    }

    async fn handle_text(&self, text: &str) {
        match codec::decode(text) {
            Ok(command) => {
                metrics::record_command(command.kind());
                self.dispatch(command).await;
            }
            Err(e) => {
                metrics::record_malformed_frame();
                warn!(error = %e, frame_len = text.len(), "Dropping malformed frame");
            }
        }
    }

    async fn dispatch(&self, command: Command) {
        let verbose = self.broker.config().verbose;
        let id = self.connection.id();

        match command {
            Command::Subscribe { topic } => {
                let added = self.broker.registry().subscribe(&topic, self.sender.clone());
                relay_event!(verbose, connection_id = %id, topic = %topic, added, "Subscribed");
            }
            Command::Unsubscribe { topic } => {
                let removed = self.broker.registry().unsubscribe(&topic, id);
                relay_event!(verbose, connection_id = %id, topic = %topic, removed, "Unsubscribed");
            }
            Command::Publish { topic, payload } => {
                let report = self.broker.publish(&topic, &payload, Some(id)).await;
                relay_event!(
                    verbose,
                    connection_id = %id,
                    topic = %topic,
                    recipients = report.recipients,
                    delivered = report.delivered,
                    failed = report.failed,
                    "Relayed publish"
                );
            }
        }
    }
}

//! The relay server.
//!
//! Accepts TCP connections, serves HTTP/1.1 on each with `hyper`, and turns
//! valid WebSocket upgrade requests into broker sessions.
//!
//! | Request | Response |
//! |---------|----------|
//! | path outside the mount path | `404 Not Found` |
//! | not a WebSocket upgrade | `400 Bad Request` |
//! | server shutting down or full | `503 Service Unavailable` |
//! | valid upgrade | `101 Switching Protocols`, then a session |
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_server::{Server, ServerConfig};
//!
//! let server = Server::new(ServerConfig::default());
//! let broker = server.broker().clone();
//! server.run().await?;
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use hermes_broker::{Broker, BrokerConfig, Session};
use hermes_ws::handshake::{self, prepare_upgrade};
use hermes_ws::{Connection, ConnectionConfig, ConnectionSender};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};

/// The byte stream behind an upgraded connection.
pub type RelayStream = TokioIo<Upgraded>;

/// The broker type shared by every session on a [`Server`].
pub type RelayBroker = Broker<ConnectionSender<RelayStream>>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<Full<Bytes>>;

/// The Hermes relay server.
pub struct Server {
    config: ServerConfig,
    connection_config: ConnectionConfig,
    broker: RelayBroker,
    sessions: ConnectionTracker,
}

impl Server {
    /// Creates a server with default connection and broker settings.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the broker shared by all sessions.
    ///
    /// The host process can publish through it; such publishes reach every
    /// subscriber of the topic.
    #[must_use]
    pub fn broker(&self) -> &RelayBroker {
        &self.broker
    }

    /// Returns the number of open sessions.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.active_connections()
    }

    /// Runs the server until SIGTERM or SIGINT.
    pub async fn run(self) -> ServerResult<()> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::BindError(format!(
                "Invalid address '{}': {}",
                self.config.listen_addr(),
                e
            ))
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {addr}: {e}")))?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// triggers, then waits up to the shutdown timeout for sessions to end.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, path = %self.config.path(), "Relay listening");

        let server = Arc::new(self);
        let connections = ConnectionTracker::new();

        loop {
            tokio::select! {
                biased;

                () = shutdown.recv() => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(&server);
                            let token = connections.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, peer_addr, shutdown).await {
                                    debug!(peer_addr = %peer_addr, error = %e, "HTTP connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        let shutdown_timeout = server.config.shutdown_timeout();
        info!(
            timeout = ?shutdown_timeout,
            sessions = server.sessions.active_connections(),
            "Waiting for sessions to close"
        );

        let drained = tokio::time::timeout(shutdown_timeout, async {
            tokio::join!(
                connections.wait_for_shutdown(),
                server.sessions.wait_for_shutdown()
            );
        })
        .await;

        if drained.is_err() {
            warn!(
                sessions = server.sessions.active_connections(),
                "Shutdown timeout reached with sessions still open"
            );
        }

        info!("Relay stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        peer_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);
        let request_shutdown = shutdown.clone();

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            let shutdown = request_shutdown.clone();
            async move { Ok::<_, Infallible>(server.handle_request(req, peer_addr, shutdown)) }
        });

        let conn = http1::Builder::new()
            .serve_connection(io, service)
            .with_upgrades();

        tokio::select! {
            result = conn => result,
            () = shutdown.recv() => {
                debug!(peer_addr = %peer_addr, "HTTP connection dropped for shutdown");
                Ok(())
            }
        }
    }

    fn handle_request(
        self: &Arc<Self>,
        req: Request<Incoming>,
        peer_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> HttpResponse {
        let path = req.uri().path();
        debug!(peer_addr = %peer_addr, method = %req.method(), path = %path, "HTTP request");

        if !self.config.accepts_path(path) {
            return handshake::reject(StatusCode::NOT_FOUND, "not found");
        }

        let upgrade = prepare_upgrade(&req);
        if !upgrade.success {
            return upgrade.response;
        }

        if shutdown.is_shutdown() {
            return handshake::reject(StatusCode::SERVICE_UNAVAILABLE, "server shutting down");
        }

        let Some(token) = self.sessions.try_acquire(self.config.max_connections()) else {
            warn!(peer_addr = %peer_addr, "Connection limit reached, rejecting upgrade");
            return handshake::reject(StatusCode::SERVICE_UNAVAILABLE, "too many connections");
        };

        let server = Arc::clone(self);
        tokio::spawn(async move {
            server.run_session(req, peer_addr, shutdown, token).await;
        });

        upgrade.response
    }

    async fn run_session(
        &self,
        req: Request<Incoming>,
        peer_addr: SocketAddr,
        shutdown: ShutdownSignal,
        _token: ConnectionToken,
    ) {
        let upgraded = match hyper::upgrade::on(req).await {
            Ok(upgraded) => upgraded,
            Err(e) => {
                warn!(peer_addr = %peer_addr, error = %e, "WebSocket upgrade failed");
                return;
            }
        };

        let connection =
            Connection::from_raw_socket(TokioIo::new(upgraded), &self.connection_config).await;
        info!(peer_addr = %peer_addr, connection_id = %connection.id(), "Connection accepted");

        let session = Session::new(connection, self.broker.clone());
        session.run(shutdown.recv()).await;
    }
}

/// Builder for [`Server`].
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: ServerConfig,
    connection_config: ConnectionConfig,
    broker_config: BrokerConfig,
}

impl ServerBuilder {
    /// Sets the acceptor configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the per-connection transport configuration.
    #[must_use]
    pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    /// Sets the broker configuration.
    #[must_use]
    pub fn broker_config(mut self, config: BrokerConfig) -> Self {
        self.broker_config = config;
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            config: self.config,
            connection_config: self.connection_config,
            broker: Broker::new(self.broker_config),
            sessions: ConnectionTracker::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder() {
        let server = Server::builder()
            .config(ServerConfig::builder().listen_addr("127.0.0.1:0").build())
            .broker_config(BrokerConfig::default().verbose(true))
            .build();

        assert_eq!(server.config().listen_addr(), "127.0.0.1:0");
        assert!(server.broker().config().verbose);
        assert_eq!(server.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_invalid_address_is_bind_error() {
        let server = Server::new(ServerConfig::builder().listen_addr("not-an-addr").build());
        let result = server.run_with_shutdown(ShutdownSignal::new()).await;
        assert!(matches!(result, Err(ServerError::BindError(_))));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Server::new(
            ServerConfig::builder()
                .shutdown_timeout(Duration::from_secs(1))
                .build(),
        );
        let shutdown = ShutdownSignal::new();
        let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("server should stop")
            .expect("task should not panic")
            .expect("serve should succeed");
    }
}

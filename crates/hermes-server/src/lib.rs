//! TCP acceptor, WebSocket upgrade and graceful shutdown for the Hermes relay.
//!
//! ```text
//! TcpListener ──► hyper http1 (with upgrades) ──► handshake checks
//!                                                   │
//!                      404 / 400 / 503 ◄────────────┤
//!                                                   ▼
//!                                  101 ──► Connection ──► Session (hermes-broker)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_server::{Server, ServerConfig, ShutdownSignal};
//!
//! let server = Server::new(ServerConfig::builder().listen_addr("0.0.0.0:9900").build());
//! server.run_with_shutdown(ShutdownSignal::with_os_signals()).await?;
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{ServerError, ServerResult};
pub use server::{RelayBroker, RelayStream, Server, ServerBuilder};
pub use shutdown::{ConnectionTracker, ShutdownReceiver, ShutdownSignal};

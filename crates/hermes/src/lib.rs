//! # Hermes
//!
//! **A WebSocket publish/subscribe relay.**
//!
//! Clients connect over WebSocket, subscribe to named topics, and publish
//! payloads to them. Every publish is relayed to each current subscriber of
//! its topic except the client that sent it. A disconnected client is removed
//! from every topic it joined.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hermes::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().with_env_prefix("HERMES").load()?;
//!     let server = hermes::build_server(&config);
//!
//!     // Publish from the host process as well as from clients.
//!     let broker = server.broker().clone();
//!     tokio::spawn(async move {
//!         broker.publish("status", "relay up", None).await;
//!     });
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! ```text
//! hermes-server ─ TCP accept, HTTP upgrade, shutdown
//!      │
//! hermes-broker ─ codec, registry, fan-out, sessions
//!      │
//! hermes-ws ───── WebSocket connection handle and handshake
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod runtime;

pub use runtime::{broker_config, build_server, connection_config, server_config, telemetry_config};

pub use hermes_broker as broker;
pub use hermes_config as config;
pub use hermes_server as server;
pub use hermes_telemetry as telemetry;
pub use hermes_ws as ws;

pub use hermes_config::{ConfigError, ConfigLoader, HermesConfig};
pub use hermes_telemetry::init_telemetry;

/// Crate version, reported by `hermes --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use hermes_broker::{
        Broker, BrokerConfig, BrokerError, Command, PublishReport, RegistryStats, WireFormat,
    };
    pub use hermes_config::{ConfigError, ConfigLoader, HermesConfig};
    pub use hermes_server::{RelayBroker, Server, ServerConfig, ShutdownSignal};
    pub use hermes_telemetry::{init_telemetry, TelemetryConfig};
    pub use hermes_ws::{CloseCode, ConnectionConfig, ConnectionId, WsError};
}

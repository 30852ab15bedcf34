//! Topic registry, command protocol and broadcast engine for the Hermes relay.
//!
//! Clients send one command per text frame. `SUBSCRIBE <topic>` and
//! `UNSUBSCRIBE <topic>` change topic membership; anything else of the form
//! `<topic> <payload>` is relayed to every other subscriber of the topic.
//! A JSON form carrying the same three commands is also accepted (see
//! [`codec`]).
//!
//! # Example
//!
//! ```ignore
//! use hermes_broker::{Broker, BrokerConfig, Session};
//! use hermes_ws::{Connection, ConnectionConfig};
//!
//! let broker = Broker::new(BrokerConfig::default());
//!
//! // For each upgraded stream:
//! let connection = Connection::from_raw_socket(io, &ConnectionConfig::default()).await;
//! let session = Session::new(connection, broker.clone());
//! tokio::spawn(session.run(shutdown.recv()));
//!
//! // The host process may publish too; every subscriber receives it.
//! broker.publish("news", "server says hi", None).await;
//! ```
//!
//! # Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`codec`] | Frame text <-> [`Command`] |
//! | [`registry`] | Topic -> subscribers index |
//! | [`broadcast`] | Concurrent fan-out, originator excluded |
//! | [`session`] | Per-connection dispatch loop |
//! | [`lifecycle`] | Guaranteed registry cleanup on teardown |

pub mod broadcast;
pub mod broker;
pub mod codec;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod outbound;
pub mod registry;
pub mod session;

#[cfg(test)]
mod testing;

pub use broadcast::PublishReport;
pub use broker::Broker;
pub use codec::{decode, encode, encode_as, Command, WireFormat};
pub use config::BrokerConfig;
pub use error::{BrokerError, BrokerResult};
pub use lifecycle::{Registration, TeardownReason};
pub use outbound::Outbound;
pub use registry::{RegistryStats, SubscriptionRegistry};
pub use session::Session;

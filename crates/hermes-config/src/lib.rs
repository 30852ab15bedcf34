//! Typed configuration for the Hermes relay.
//!
//! Configuration is layered: defaults, then a TOML or JSON file, then
//! `HERMES__SECTION__KEY` environment variables. Every section rejects
//! unknown fields.
//!
//! # Example
//!
//! ```no_run
//! use hermes_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("hermes.toml")?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! println!("Relay will listen on: {}", config.server.listen_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0:9900"
//! path = "/"
//! shutdown_timeout_secs = 30
//! max_connections = 10000
//!
//! [connection]
//! max_message_size = 1048576
//! max_frame_size = 262144
//!
//! [broker]
//! send_timeout_ms = 5000
//! outbound_format = "structured"
//! verbose = false
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9091"
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HermesConfig;
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::*;

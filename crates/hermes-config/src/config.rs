//! The root [`HermesConfig`] type.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{
    BrokerSection, ConfigError, ConnectionSection, LogFormat, ServerSection, TelemetrySection,
};

/// Complete relay configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.server.listen_addr, "0.0.0.0:9900");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Acceptor configuration.
    #[serde(default)]
    pub server: ServerSection,

    /// Per-connection transport limits.
    #[serde(default)]
    pub connection: ConnectionSection,

    /// Broker configuration.
    #[serde(default)]
    pub broker: BrokerSection,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl HermesConfig {
    /// Local development preset: pretty debug logs, verbose relay events.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.listen_addr = "127.0.0.1:9900".to_string();
        config.broker.verbose = true;
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config
    }

    /// Production preset: JSON logs and the Prometheus exporter.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.metrics.enabled = true;
        config
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The listen address, or the metrics address when enabled, is not a
    ///   socket address
    /// - The mount path does not start with `/`
    /// - A timeout, size or connection limit is zero
    /// - The frame size exceeds the message size
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_addr("server.listen_addr", &self.server.listen_addr)?;

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "server.path",
                format!("must start with '/': {}", self.server.path),
            ));
        }

        if self.server.shutdown_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.shutdown_timeout_secs",
                "must be greater than zero",
            ));
        }

        if self.server.max_connections == Some(0) {
            return Err(ConfigError::invalid_value(
                "server.max_connections",
                "must be greater than zero; leave unset for no limit",
            ));
        }

        if self.connection.max_message_size == 0 {
            return Err(ConfigError::invalid_value(
                "connection.max_message_size",
                "must be greater than zero",
            ));
        }

        if self.connection.max_frame_size == 0 {
            return Err(ConfigError::invalid_value(
                "connection.max_frame_size",
                "must be greater than zero",
            ));
        }

        if self.connection.max_frame_size > self.connection.max_message_size {
            return Err(ConfigError::invalid_value(
                "connection.max_frame_size",
                "must not exceed connection.max_message_size",
            ));
        }

        if self.broker.send_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "broker.send_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.telemetry.metrics.enabled {
            validate_addr("telemetry.metrics.addr", &self.telemetry.metrics.addr)?;
        }

        Ok(())
    }
}

fn validate_addr(field: &str, addr: &str) -> Result<(), ConfigError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ConfigError::invalid_value(field, format!("invalid socket address: {addr}")))
}

//! Turns a loaded [`HermesConfig`] into the runtime configuration of each
//! crate.

use std::time::Duration;

use hermes_broker::BrokerConfig;
use hermes_config::{HermesConfig, LogFormat};
use hermes_server::{Server, ServerConfig};
use hermes_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};
use hermes_ws::ConnectionConfig;

/// Acceptor settings from the `[server]` section.
pub fn server_config(config: &HermesConfig) -> ServerConfig {
    ServerConfig::builder()
        .listen_addr(config.server.listen_addr.clone())
        .path(config.server.path.clone())
        .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
        .max_connections(config.server.max_connections)
        .build()
}

/// Transport limits from the `[connection]` section.
pub fn connection_config(config: &HermesConfig) -> ConnectionConfig {
    let section = &config.connection;
    ConnectionConfig::new()
        .max_message_size(section.max_message_size)
        .max_frame_size(section.max_frame_size)
        .write_buffer_size(section.write_buffer_size)
        .accept_unmasked_frames(section.accept_unmasked_frames)
}

/// Broker settings from the `[broker]` section.
pub fn broker_config(config: &HermesConfig) -> BrokerConfig {
    BrokerConfig::new()
        .send_timeout(Duration::from_millis(config.broker.send_timeout_ms))
        .outbound_format(config.broker.outbound_format)
        .verbose(config.broker.verbose)
}

/// Logging and metrics settings from the `[telemetry]` section.
pub fn telemetry_config(config: &HermesConfig) -> TelemetryConfig {
    let logging = &config.telemetry.logging;
    let metrics = &config.telemetry.metrics;

    TelemetryConfig {
        logging: LogConfig {
            enabled: logging.enabled,
            level: logging.level.clone(),
            json_format: logging.format == LogFormat::Json,
            file_line_info: logging.include_location,
        },
        metrics: MetricsConfig {
            enabled: metrics.enabled,
            addr: metrics.addr.clone(),
        },
    }
}

/// Builds a relay server from a validated configuration.
///
/// # Example
///
/// ```
/// use hermes::{build_server, HermesConfig};
///
/// let server = build_server(&HermesConfig::default());
/// assert_eq!(server.config().listen_addr(), "0.0.0.0:9900");
/// ```
pub fn build_server(config: &HermesConfig) -> Server {
    Server::builder()
        .config(server_config(config))
        .connection_config(connection_config(config))
        .broker_config(broker_config(config))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_broker::WireFormat;
    use hermes_config::ConfigLoader;

    fn sample() -> HermesConfig {
        ConfigLoader::new()
            .with_string(
                r#"
                [server]
                listen_addr = "127.0.0.1:7000"
                path = "/relay"
                shutdown_timeout_secs = 5
                max_connections = 100

                [connection]
                max_message_size = 4096
                max_frame_size = 1024

                [broker]
                send_timeout_ms = 750
                outbound_format = "legacy"
                verbose = true

                [telemetry.logging]
                level = "debug"
                format = "pretty"
                include_location = true

                [telemetry.metrics]
                enabled = true
                addr = "127.0.0.1:9191"
                "#,
                "toml",
            )
            .unwrap()
            .load()
            .unwrap()
    }

    #[test]
    fn test_server_config() {
        let server = server_config(&sample());
        assert_eq!(server.listen_addr(), "127.0.0.1:7000");
        assert_eq!(server.path(), "/relay");
        assert_eq!(server.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(server.max_connections(), Some(100));
    }

    #[test]
    fn test_connection_config() {
        let connection = connection_config(&sample());
        assert_eq!(connection.max_message_size, 4096);
        assert_eq!(connection.max_frame_size, 1024);
        assert_eq!(connection.write_buffer_size, ConnectionConfig::default().write_buffer_size);
    }

    #[test]
    fn test_broker_config() {
        let broker = broker_config(&sample());
        assert_eq!(broker.send_timeout, Duration::from_millis(750));
        assert_eq!(broker.outbound_format, WireFormat::Legacy);
        assert!(broker.verbose);
    }

    #[test]
    fn test_telemetry_config() {
        let telemetry = telemetry_config(&sample());
        assert_eq!(telemetry.logging.level, "debug");
        assert!(!telemetry.logging.json_format);
        assert!(telemetry.logging.file_line_info);
        assert!(telemetry.metrics.enabled);
        assert_eq!(telemetry.metrics.addr, "127.0.0.1:9191");
    }

    #[test]
    fn test_defaults_match_crate_defaults() {
        let config = HermesConfig::default();
        assert_eq!(server_config(&config), ServerConfig::default());
        assert_eq!(connection_config(&config), ConnectionConfig::default());
        assert_eq!(broker_config(&config), BrokerConfig::default());
        assert_eq!(telemetry_config(&config).metrics, MetricsConfig::default());
    }

    #[test]
    fn test_build_server() {
        let server = build_server(&sample());
        assert_eq!(server.config().path(), "/relay");
        assert!(server.broker().config().verbose);
        assert_eq!(server.broker().config().outbound_format, WireFormat::Legacy);
    }
}

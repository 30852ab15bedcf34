//! Configuration schema types.
//!
//! Every section rejects unknown fields and fills missing ones with defaults,
//! so a file only needs the keys it changes.

use hermes_broker::WireFormat;
use serde::{Deserialize, Serialize};

/// Acceptor section.
///
/// # Example
///
/// ```
/// use hermes_config::ServerSection;
///
/// let server = ServerSection {
///     path: "/relay".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(server.listen_addr, "0.0.0.0:9900");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Listen address (e.g., "0.0.0.0:9900").
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// URL path prefix the relay is mounted at.
    #[serde(default = "default_path")]
    pub path: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum number of concurrent sessions. Unset means unlimited.
    #[serde(default)]
    pub max_connections: Option<usize>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            path: default_path(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_connections: None,
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:9900".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Per-connection transport limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    /// Maximum message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Maximum frame size in bytes.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,

    /// Write buffer size in bytes.
    #[serde(default = "default_write_buffer_size")]
    pub write_buffer_size: usize,

    /// Accept unmasked frames from clients.
    #[serde(default)]
    pub accept_unmasked_frames: bool,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            max_frame_size: default_max_frame_size(),
            write_buffer_size: default_write_buffer_size(),
            accept_unmasked_frames: false,
        }
    }
}

fn default_max_message_size() -> usize {
    1024 * 1024
}

fn default_max_frame_size() -> usize {
    256 * 1024
}

fn default_write_buffer_size() -> usize {
    128 * 1024
}

/// Broker section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BrokerSection {
    /// Upper bound on one delivery to one subscriber, in milliseconds.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Encoding of relayed publish frames ("structured" or "legacy").
    #[serde(default)]
    pub outbound_format: WireFormat,

    /// Log every subscribe, unsubscribe and relay at info level.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout_ms(),
            outbound_format: WireFormat::default(),
            verbose: false,
        }
    }
}

fn default_send_timeout_ms() -> u64 {
    5000
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Install the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus exporter address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9091".to_string()
}

/// Telemetry section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsSection,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let server = ServerSection::default();
        assert_eq!(server.listen_addr, "0.0.0.0:9900");
        assert_eq!(server.path, "/");
        assert_eq!(server.shutdown_timeout_secs, 30);
        assert_eq!(server.max_connections, None);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let broker: BrokerSection = toml::from_str("verbose = true").unwrap();
        assert!(broker.verbose);
        assert_eq!(broker.send_timeout_ms, 5000);
        assert_eq!(broker.outbound_format, WireFormat::Structured);
    }

    #[test]
    fn test_outbound_format_parses_lowercase() {
        let broker: BrokerSection = toml::from_str(r#"outbound_format = "legacy""#).unwrap();
        assert_eq!(broker.outbound_format, WireFormat::Legacy);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ConnectionSection, _> = toml::from_str("max_msg_size = 10");
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_lowercase() {
        let logging: LoggingSection = serde_json::from_str(r#"{"format": "pretty"}"#).unwrap();
        assert_eq!(logging.format, LogFormat::Pretty);
        assert!(logging.enabled);
    }

    #[test]
    fn test_metrics_disabled_by_default() {
        let metrics = MetricsSection::default();
        assert!(!metrics.enabled);
        assert_eq!(metrics.addr, "0.0.0.0:9091");
    }
}

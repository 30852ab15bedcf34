//! Prometheus metrics for the relay.
//!
//! Recording functions are always safe to call. Until [`init_metrics`]
//! installs a recorder they are no-ops.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_connections_total` | Counter | - | Connections accepted |
//! | `hermes_active_connections` | Gauge | - | Connections currently open |
//! | `hermes_commands_total` | Counter | `kind` | Decoded commands |
//! | `hermes_malformed_frames_total` | Counter | - | Frames that failed to decode |
//! | `hermes_publishes_total` | Counter | - | Publish operations |
//! | `hermes_deliveries_total` | Counter | `result` | Per-subscriber deliveries |
//! | `hermes_fanout_size` | Histogram | - | Recipients per publish |

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether the Prometheus exporter is installed.
    pub enabled: bool,

    /// Address the exporter listens on (e.g., "0.0.0.0:9091").
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9091".to_string(),
        }
    }
}

/// Installs the Prometheus recorder and spawns its HTTP listener.
///
/// Does nothing when metrics are disabled. Must be called from within a
/// tokio runtime, which drives the listener.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    register_metric_descriptions();

    Ok(())
}

fn register_metric_descriptions() {
    describe_counter!(
        "hermes_connections_total",
        "Total number of WebSocket connections accepted"
    );
    describe_gauge!(
        "hermes_active_connections",
        "Number of WebSocket connections currently open"
    );
    describe_counter!(
        "hermes_commands_total",
        "Total number of decoded commands by kind"
    );
    describe_counter!(
        "hermes_malformed_frames_total",
        "Total number of inbound frames that could not be decoded"
    );
    describe_counter!(
        "hermes_publishes_total",
        "Total number of publish operations"
    );
    describe_counter!(
        "hermes_deliveries_total",
        "Total number of per-subscriber deliveries by result"
    );
    describe_histogram!(
        "hermes_fanout_size",
        "Number of recipients per publish"
    );
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Records an accepted connection.
pub fn record_connection_opened() {
    counter!("hermes_connections_total").increment(1);
    gauge!("hermes_active_connections").increment(1.0);
}

/// Records a connection teardown.
pub fn record_connection_closed() {
    gauge!("hermes_active_connections").decrement(1.0);
}

/// Records a decoded command (`subscribe`, `unsubscribe` or `publish`).
pub fn record_command(kind: &'static str) {
    counter!("hermes_commands_total", "kind" => kind).increment(1);
}

/// Records a frame that failed to decode.
pub fn record_malformed_frame() {
    counter!("hermes_malformed_frames_total").increment(1);
}

/// Records one publish and its fan-out outcome.
///
/// * `recipients` - subscribers targeted, originator excluded
/// * `delivered` - sends that completed
/// * `failed` - sends that failed or timed out
pub fn record_publish(recipients: usize, delivered: usize, failed: usize) {
    counter!("hermes_publishes_total").increment(1);
    histogram!("hermes_fanout_size").record(recipients as f64);
    counter!("hermes_deliveries_total", "result" => "delivered").increment(delivered as u64);
    counter!("hermes_deliveries_total", "result" => "failed").increment(failed as u64);
}

/// Guard that keeps `hermes_active_connections` accurate.
///
/// Increments on creation and decrements on drop, even if the session task
/// panics.
#[derive(Debug)]
pub struct ConnectionGuard {
    _private: (),
}

impl ConnectionGuard {
    /// Records a new connection and returns the guard.
    #[must_use]
    pub fn new() -> Self {
        record_connection_opened();
        Self { _private: () }
    }
}

impl Default for ConnectionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        record_connection_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9091");
    }

    #[test]
    fn test_disabled_metrics_is_noop() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-address".to_string(),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_record_functions_dont_panic() {
        // No recorder installed: all of these are no-ops.
        record_command("subscribe");
        record_malformed_frame();
        record_publish(3, 2, 1);
        let guard = ConnectionGuard::new();
        drop(guard);
    }
}

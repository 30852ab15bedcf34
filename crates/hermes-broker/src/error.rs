//! Broker error types.

use hermes_ws::{ConnectionId, WsError};
use thiserror::Error;

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors raised by the codec, the registry and fan-out delivery.
///
/// None of these end a session. Malformed frames are dropped and failed
/// deliveries are counted and skipped.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// An inbound frame did not decode to a command.
    #[error("malformed frame: {reason}")]
    MalformedFrame {
        /// Why decoding failed.
        reason: String,
    },

    /// A subscriber was already closed when a publish reached it.
    #[error("connection {connection_id} is closed")]
    ConnectionClosed {
        /// The closed subscriber.
        connection_id: ConnectionId,
    },

    /// Delivery to a subscriber failed.
    #[error("delivery to {connection_id} failed: {reason}")]
    SendFailed {
        /// The subscriber that could not be reached.
        connection_id: ConnectionId,
        /// Transport error text.
        reason: String,
    },

    /// The subscription registry violated one of its invariants.
    #[error("registry corruption: {0}")]
    RegistryCorruption(String),
}

impl BrokerError {
    /// Create a new malformed frame error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }

    /// Classify a failed send to `connection_id`.
    pub fn delivery(connection_id: ConnectionId, err: WsError) -> Self {
        match err {
            WsError::ConnectionClosed { .. } => Self::ConnectionClosed { connection_id },
            other => Self::SendFailed {
                connection_id,
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_malformed_is_recoverable() {
        let err = BrokerError::malformed("empty frame");
        assert_eq!(err.to_string(), "malformed frame: empty frame");
    }

    #[test]
    fn test_delivery_classification() {
        let id = ConnectionId::new();
        let closed = BrokerError::delivery(id, WsError::connection_closed("gone"));
        assert!(matches!(closed, BrokerError::ConnectionClosed { connection_id } if connection_id == id));

        let failed = BrokerError::delivery(id, WsError::send_failed("broken pipe"));
        assert!(matches!(failed, BrokerError::SendFailed { .. }));

        let timed_out = BrokerError::delivery(id, WsError::SendTimeout(Duration::from_millis(50)));
        assert_eq!(
            timed_out.to_string(),
            format!("delivery to {id} failed: send timed out after 50ms")
        );
    }
}

//! Broker runtime configuration.

use std::time::Duration;

use crate::codec::WireFormat;

/// Default per-subscriber send deadline.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the broker and every session it drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Upper bound on one delivery to one subscriber.
    pub send_timeout: Duration,
    /// Encoding of relayed publish frames.
    pub outbound_format: WireFormat,
    /// Log per-frame relay events at `info` instead of `debug`.
    pub verbose: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            send_timeout: DEFAULT_SEND_TIMEOUT,
            outbound_format: WireFormat::Structured,
            verbose: false,
        }
    }
}

impl BrokerConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-subscriber send deadline.
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the encoding of relayed publish frames.
    pub fn outbound_format(mut self, format: WireFormat) -> Self {
        self.outbound_format = format;
        self
    }

    /// Enable or disable verbose relay logging.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

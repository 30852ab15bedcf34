//! Per-connection transport configuration.

/// Configuration for a single WebSocket connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Maximum message size in bytes (default: 1 MB).
    pub max_message_size: usize,
    /// Maximum frame size in bytes (default: 256 KB).
    pub max_frame_size: usize,
    /// Write buffer size (default: 128 KB).
    pub write_buffer_size: usize,
    /// Whether to accept unmasked frames from clients (default: false).
    pub accept_unmasked_frames: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_size: 1024 * 1024, // 1 MB
            max_frame_size: 256 * 1024,    // 256 KB
            write_buffer_size: 128 * 1024, // 128 KB
            accept_unmasked_frames: false,
        }
    }
}

impl ConnectionConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum message size.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the maximum frame size.
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the write buffer size.
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Set whether to accept unmasked frames from clients.
    pub fn accept_unmasked_frames(mut self, accept: bool) -> Self {
        self.accept_unmasked_frames = accept;
        self
    }

    /// Translate into the protocol-level configuration used by tungstenite.
    pub fn to_protocol_config(&self) -> tungstenite::protocol::WebSocketConfig {
        let mut config = tungstenite::protocol::WebSocketConfig::default();
        config.max_message_size = Some(self.max_message_size);
        config.max_frame_size = Some(self.max_frame_size);
        config.write_buffer_size = self.write_buffer_size;
        config.accept_unmasked_frames = self.accept_unmasked_frames;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_message_size, 1024 * 1024);
        assert_eq!(config.max_frame_size, 256 * 1024);
        assert!(!config.accept_unmasked_frames);
    }

    #[test]
    fn test_builder_feeds_protocol_config() {
        let config = ConnectionConfig::new()
            .max_message_size(4096)
            .max_frame_size(1024)
            .accept_unmasked_frames(true);

        let protocol = config.to_protocol_config();
        assert_eq!(protocol.max_message_size, Some(4096));
        assert_eq!(protocol.max_frame_size, Some(1024));
        assert!(protocol.accept_unmasked_frames);
    }
}

//! Server configuration types.
//!
//! # Example
//!
//! ```rust
//! use hermes_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .listen_addr("127.0.0.1:9900")
//!     .path("/relay")
//!     .shutdown_timeout(Duration::from_secs(10))
//!     .build();
//!
//! assert!(config.accepts_path("/relay"));
//! assert!(!config.accepts_path("/other"));
//! ```

use std::net::SocketAddr;
use std::time::Duration;

/// Default listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9900";

/// Default mount path.
pub const DEFAULT_PATH: &str = "/";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Acceptor configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    listen_addr: String,
    path: String,
    shutdown_timeout: Duration,
    max_connections: Option<usize>,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the listen address.
    #[must_use]
    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    /// Parses the listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.listen_addr.parse()
    }

    /// Returns the URL path prefix the relay is mounted at.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns how long shutdown waits for open sessions.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the session limit, if any.
    #[must_use]
    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    /// Whether a request path falls under the mount path.
    ///
    /// `/relay` accepts `/relay` and `/relay/anything` but not `/relayx`.
    #[must_use]
    pub fn accepts_path(&self, request_path: &str) -> bool {
        let prefix = self.path.trim_end_matches('/');
        if prefix.is_empty() {
            return true;
        }
        match request_path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    listen_addr: String,
    path: String,
    shutdown_timeout: Duration,
    max_connections: Option<usize>,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            path: DEFAULT_PATH.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            max_connections: None,
        }
    }

    /// Sets the listen address (e.g., "0.0.0.0:9900").
    #[must_use]
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Sets the mount path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets how long shutdown waits for open sessions.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the maximum number of concurrent sessions.
    #[must_use]
    pub fn max_connections(mut self, max: Option<usize>) -> Self {
        self.max_connections = max;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.listen_addr,
            path: self.path,
            shutdown_timeout: self.shutdown_timeout,
            max_connections: self.max_connections,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a [`HermesConfig`].
///
/// [`HermesConfig`]: crate::HermesConfig
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The `--config` file does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path that was given.
        path: PathBuf,
    },

    /// The configuration file exists but could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Neither TOML nor JSON, judged by file extension or format name.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// TOML did not parse, or named a field no section has.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON did not parse, or named a field no section has.
    #[error("failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A setting parsed but is out of range, e.g. a zero send timeout.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `server.path`.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// A `HERMES__*` override is unknown or its value does not parse.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Why parsing failed.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_names_path() {
        let err = ConfigError::file_not_found("/etc/hermes/hermes.toml");
        assert_eq!(
            err.to_string(),
            "configuration file not found: /etc/hermes/hermes.toml"
        );
    }

    #[test]
    fn test_invalid_value_names_field() {
        let err = ConfigError::invalid_value("server.path", "must start with '/'");
        assert_eq!(
            err.to_string(),
            "invalid configuration value for server.path: must start with '/'"
        );
    }

    #[test]
    fn test_read_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::read_error("/etc/hermes/hermes.toml", io);
        assert!(std::error::Error::source(&err).is_some());
    }
}

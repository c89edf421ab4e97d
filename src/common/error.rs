//! Error types for the application.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    IoError { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors raised by the server registry and its backing file.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Bad user input: malformed address, empty host, port out of range.
    #[error("{0}")]
    Validation(String),

    #[error("Server `{name}` is not linked")]
    NotFound { name: String },

    #[error("Failed to access registry file '{}': {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry file '{}' is corrupt: {message}", path.display())]
    CorruptData { path: PathBuf, message: String },
}

/// A2S server query errors.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Server did not answer within {}s", timeout.as_secs_f32())]
    Timeout { timeout: std::time::Duration },

    #[error("Malformed server reply: {message}")]
    Protocol { message: String },

    #[error("Network error: {message}")]
    Network { message: String },
}

impl From<std::io::Error> for QueryError {
    fn from(e: std::io::Error) -> Self {
        Self::Network {
            message: e.to_string(),
        }
    }
}

impl QueryError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Errors raised while resolving a map link through the server directory.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Server directory unavailable (HTTP {status}): {body}")]
    DirectoryUnavailable { status: u16, body: String },

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to parse {url}: {message}")]
    Parse { url: String, message: String },
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result type alias for lookup operations.
pub type LookupResult<T> = std::result::Result<T, LookupError>;

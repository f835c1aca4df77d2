//! Unified error types for Jubilee.

use thiserror::Error;

/// Result type alias using jubilee's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // User-visible input errors
    #[error("Invalid birthdate: {0}")]
    Validation(String),

    // Record store errors
    #[error("Birthday store unavailable: {0}")]
    Store(String),

    // Messaging platform errors
    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Store("disk full".into());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(Error::validation("x"), Error::Validation(_)));
        assert!(matches!(Error::store("x"), Error::Store(_)));
        assert!(matches!(Error::platform("x"), Error::Platform(_)));
        assert!(matches!(Error::config("x"), Error::Config(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}

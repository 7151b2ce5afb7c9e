// src/error.rs

//! Unified error handling for the monitor.

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or a request failed outside a fetch
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Channel page could not be retrieved this cycle
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Persistent store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Notification sink failure
    #[error("Notify error for {destination}: {message}")]
    Notify {
        destination: String,
        message: String,
    },

    /// Destination channel missing or unusable
    #[error("Destination unavailable: {0}")]
    Destination(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for a URL.
    pub fn fetch(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Create a notification error.
    pub fn notify(destination: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Notify {
            destination: destination.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error only means "no update this cycle".
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Destination(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_message() {
        let err = AppError::fetch("https://youtube.com/@x", "HTTP status 404");
        assert_eq!(
            err.to_string(),
            "Fetch failed for https://youtube.com/@x: HTTP status 404"
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_store_error_not_transient() {
        assert!(!AppError::store("disk full").is_transient());
    }
}

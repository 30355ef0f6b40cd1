// src/error.rs

//! Unified error handling for the fetch client.

use thiserror::Error;

/// Result type alias for fetch client operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Roster CSV reading failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Server answered outside the 2xx range
    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Transport succeeded but the body was empty
    #[error("empty response body for {url}")]
    EmptyResponse { url: String },

    /// Body does not start with `{` or `[`, so it cannot be the report JSON
    #[error("response body is not JSON for {url}")]
    InvalidBody { url: String },

    /// Fetch error with context
    #[error("fetch error for {url}: {message}")]
    Fetch { url: String, message: String },
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

    /// Create a fetch error with context.
    pub fn fetch(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Whether this is a transient transport fault worth retrying.
    ///
    /// Covers timeouts, DNS and connect failures, and send/recv faults
    /// (truncated or empty replies surface as body errors). Protocol errors
    /// and everything that is not transport-level are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Http(e) => {
                !e.is_builder()
                    && !e.is_redirect()
                    && (e.is_timeout()
                        || e.is_connect()
                        || e.is_body()
                        || e.is_decode()
                        || e.is_request())
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_are_permanent() {
        let status = AppError::HttpStatus {
            url: "https://example.com".into(),
            status: 404,
        };
        assert!(!status.is_transient());

        let empty = AppError::EmptyResponse {
            url: "https://example.com".into(),
        };
        assert!(!empty.is_transient());

        let body = AppError::InvalidBody {
            url: "https://example.com".into(),
        };
        assert!(!body.is_transient());
    }

    #[test]
    fn test_config_errors_are_permanent() {
        assert!(!AppError::config("bad config").is_transient());
        assert!(!AppError::validation("bad data").is_transient());
    }
}

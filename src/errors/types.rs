//! Error type definitions for m3u-sieve

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Persistent store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Playlist source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Caller input rejected before any work started
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Output file errors
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Persistent store specific errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Record not found
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },

    /// A stored value could not be interpreted
    #[error("Invalid stored value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

/// Playlist source errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Network timeouts
    #[error("Timeout: {url}")]
    Timeout { url: String },

    /// Connection could not be established
    #[error("Connection failed: {url}")]
    Connection { url: String },

    /// Non-success HTTP responses
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// Body could not be read or decoded
    #[error("Body error: {message}")]
    Body { message: String },

    /// Anything else the HTTP layer reported
    #[error("Request failed: {message}")]
    Request { message: String },
}

impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io<P: Into<String>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl StoreError {
    pub fn not_found<T: Into<String>, F: Into<String>, V: Into<String>>(
        table: T,
        field: F,
        value: V,
    ) -> Self {
        Self::RecordNotFound {
            table: table.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

impl SourceError {
    /// Short human-readable reason, suitable for a test result detail
    pub fn reason(&self) -> String {
        match self {
            SourceError::Timeout { .. } => "Timeout".to_string(),
            SourceError::Connection { .. } => "Connection error".to_string(),
            SourceError::Http { status } => format!("HTTP {status}"),
            SourceError::Body { message } | SourceError::Request { message } => {
                message.chars().take(50).collect()
            }
        }
    }

    /// Classify a reqwest error into a source error
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        let url = crate::utils::url::UrlUtils::obfuscate_credentials(url);
        if error.is_timeout() {
            SourceError::Timeout { url }
        } else if error.is_connect() {
            SourceError::Connection { url }
        } else if let Some(status) = error.status() {
            SourceError::Http {
                status: status.as_u16(),
            }
        } else if error.is_body() || error.is_decode() {
            SourceError::Body {
                message: error.to_string(),
            }
        } else {
            SourceError::Request {
                message: crate::utils::url::UrlUtils::obfuscate_credentials(&error.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_reasons() {
        assert_eq!(
            SourceError::Timeout { url: "http://x".into() }.reason(),
            "Timeout"
        );
        assert_eq!(
            SourceError::Connection { url: "http://x".into() }.reason(),
            "Connection error"
        );
        assert_eq!(SourceError::Http { status: 404 }.reason(), "HTTP 404");

        let long = SourceError::Request {
            message: "x".repeat(120),
        };
        assert_eq!(long.reason().len(), 50);
    }

    #[test]
    fn test_validation_message() {
        let err = AppError::validation("no links");
        assert_eq!(err.to_string(), "Validation error: no links");
    }
}

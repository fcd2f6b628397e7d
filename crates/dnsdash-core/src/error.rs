//! Error types for dnsdash
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dnsdash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dnsdash
#[derive(Error, Debug)]
pub enum Error {
    /// Bad textual IPv6/IPv4 address or prefix input
    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    /// Missing or invalid field, detected locally before any remote call
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A remote call failed (transport error, non-success envelope, malformed payload)
    #[error("Remote call failed{}: {message}", status_suffix(.status))]
    RemoteCallFailed {
        /// HTTP-style status code, when one was received
        status: Option<u16>,
        /// Reported reason
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors (import/export)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Delimited-text serialization/deserialization errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a malformed address error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedAddress(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Create a remote call error without a status code
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteCallFailed {
            status: None,
            message: message.into(),
        }
    }

    /// Create a remote call error carrying the received status code
    pub fn remote_status(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteCallFailed {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The bare reason, without the variant prefix.
    ///
    /// Bulk results and single-operation failures surface this text as-is.
    pub fn reason(&self) -> String {
        match self {
            Self::MalformedAddress(msg)
            | Self::ValidationFailed(msg)
            | Self::Config(msg)
            | Self::Other(msg) => msg.clone(),
            Self::RemoteCallFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

//! Error types for chatbridge
//!
//! Two layers live here. [`ChatBridgeError`] is the `Result` error for
//! library calls (store I/O, config parsing, HTTP plumbing). [`ChatError`] is
//! the value carried inside an error envelope, so it is `Clone` and
//! comparable.

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`ChatBridgeError`]
pub type Result<T> = std::result::Result<T, ChatBridgeError>;

/// Main error type for chatbridge
#[derive(Debug, Error)]
pub enum ChatBridgeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Store file could not be parsed
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Settings failed validation
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The adapter does not support the requested operation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Model not found in the registry
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl From<String> for ChatBridgeError {
    fn from(s: String) -> Self {
        ChatBridgeError::Other(s)
    }
}

/// Classification of a failed completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Connection refused, DNS failure, timeout
    Network,
    /// Server answered with a non-success status
    Http,
    /// Success status but the body was not the expected shape
    MalformedResponse,
    UnsupportedOperation,
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Http => "http",
            Self::MalformedResponse => "malformed_response",
            Self::UnsupportedOperation => "unsupported_operation",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Error delivered to the caller inside an error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatError {
    pub code: ErrorCode,
    pub message: String,
}

impl ChatError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The error used when a success body lacks `message.content`
    #[must_use]
    pub fn invalid_response_format() -> Self {
        Self::new(ErrorCode::MalformedResponse, "Invalid response format")
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ChatError {}

impl From<ChatBridgeError> for ChatError {
    fn from(err: ChatBridgeError) -> Self {
        match err {
            ChatBridgeError::Json(e) => ChatError::new(ErrorCode::MalformedResponse, e.to_string()),
            ChatBridgeError::UnsupportedOperation(msg) => {
                ChatError::new(ErrorCode::UnsupportedOperation, msg)
            }
            ChatBridgeError::Http(e) => ChatError::from(&e),
            other => ChatError::new(ErrorCode::Unknown, other.to_string()),
        }
    }
}

impl From<&reqwest::Error> for ChatError {
    fn from(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ChatError::new(ErrorCode::Http, format!("HTTP {status}: {err}"))
        } else if err.is_decode() {
            ChatError::new(ErrorCode::MalformedResponse, err.to_string())
        } else {
            ChatError::new(ErrorCode::Network, err.to_string())
        }
    }
}

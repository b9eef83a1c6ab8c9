//! Failure taxonomy for futures backed by remote requests.
//!
//! A failed request never raises at the call site: it becomes the terminal
//! `Failed` state of the affected future and reaches every reader as
//! `Err(ChannelError)` at the point of read. Errors are `Clone` because one
//! failure fans out to every reader sharing the future.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Connection or transport failure.
    Network,
    /// The request or the read did not complete in time.
    Timeout,
    /// The server answered, but not with a usable value (bad status, bad body,
    /// invalid key).
    Protocol,
    /// The producer went away before assigning a value.
    Cancelled,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Network => "network",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Protocol => "protocol",
            ErrorCode::Cancelled => "cancelled",
        }
    }

    /// Whether this error code is retryable by default.
    ///
    /// `Protocol` is conditionally retryable; see [`ChannelError::http_status`].
    #[must_use]
    pub fn default_retryable(self) -> bool {
        matches!(self, ErrorCode::Network | ErrorCode::Timeout)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a future.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ChannelError {
    pub code: ErrorCode,
    pub message: String,
    /// Whether issuing the request again may succeed.
    pub retryable: bool,
    /// HTTP status, when the failure came from a response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ChannelError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.default_retryable(),
            status: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Protocol, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Cancelled, message)
    }

    /// A non-success HTTP response. Retryable for 408, 429 and 5xx.
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.trim().is_empty() {
            format!("unexpected HTTP status {status}")
        } else {
            format!("unexpected HTTP status {status}: {}", body.trim())
        };
        Self {
            code: ErrorCode::Protocol,
            message,
            retryable: matches!(status, 408 | 429 | 500..=599),
            status: Some(status),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }
}

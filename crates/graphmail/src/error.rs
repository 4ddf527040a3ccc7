//! Error types for Graph mail operations.

use std::io;
use std::time::Duration;

/// Result type alias for Graph mail operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Graph mail error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required address missing or malformed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Graph API answered with an error status.
    #[error("Graph API error {status} ({code}): {message}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Graph error code (e.g., `ErrorAccessDenied`).
        code: String,
        /// Error message from the provider.
        message: String,
        /// Delay requested through the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token acquisition failed.
    #[error("Authentication error: {0}")]
    Auth(#[from] graphmail_oauth::Error),

    /// Unexpected response shape from the provider.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Large attachment upload session failed mid-transfer.
    #[error("Upload of '{attachment}' interrupted after {uploaded} of {total} bytes: {reason}")]
    PartialUpload {
        /// Attachment filename.
        attachment: String,
        /// Bytes acknowledged before the failure.
        uploaded: u64,
        /// Declared attachment length.
        total: u64,
        /// Underlying failure.
        reason: String,
    },

    /// The send was cancelled by the caller.
    #[error("send cancelled")]
    Cancelled,

    /// I/O error while reading an attachment.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of an [`Error`], carried on failed send results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Required address missing or malformed.
    InvalidAddress,
    /// Network, authentication or provider failure.
    Transport,
    /// Chunked upload failed part way through.
    PartialUpload,
    /// Cancelled by the caller.
    Cancelled,
    /// Attachment payload could not be read.
    Attachment,
    /// Sender misconfigured.
    Config,
}

impl Error {
    /// Creates a transport error from a status, code and message.
    #[must_use]
    pub fn transport(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            code: code.into(),
            message: message.into(),
            retry_after: None,
        }
    }

    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Self::Transport { .. }
            | Self::Http(_)
            | Self::Auth(_)
            | Self::Protocol(_)
            | Self::Json(_) => ErrorKind::Transport,
            Self::PartialUpload { .. } => ErrorKind::PartialUpload,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::Attachment,
            Self::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// Returns true if the failed call may succeed when repeated.
    ///
    /// Throttling (429), server errors (500, 502, 503, 504), timeouts and
    /// connection failures are transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Auth(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns true if the failure shows the request was never processed,
    /// so repeating a call that is not idempotent cannot duplicate it.
    ///
    /// Only throttling (429), 503 with a `Retry-After`, connection failures
    /// and transient token failures qualify. A timeout or a 500, 502 or 504
    /// may arrive after the provider already acted.
    #[must_use]
    pub fn is_safe_to_resend(&self) -> bool {
        match self {
            Self::Transport { status: 429, .. } => true,
            Self::Transport {
                status: 503,
                retry_after,
                ..
            } => retry_after.is_some(),
            Self::Http(e) => e.is_connect(),
            Self::Auth(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns the provider-requested retry delay, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transport { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

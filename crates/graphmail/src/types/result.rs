//! Terminal outcome of a send.

use crate::error::{Error, ErrorKind};

/// Terminal state of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Delivered to the provider for sending.
    Sent,
    /// Not sent.
    Failed,
}

/// Outcome of a send.
///
/// A sent result carries a message id and no errors; a failed result carries
/// no id and at least one error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    message_id: Option<String>,
    errors: Vec<String>,
    error_kind: Option<ErrorKind>,
}

impl SendResult {
    /// Creates a sent result.
    #[must_use]
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            errors: Vec::new(),
            error_kind: None,
        }
    }

    /// Creates a failed result from an error.
    #[must_use]
    pub fn failed(error: &Error) -> Self {
        Self {
            message_id: None,
            errors: vec![error.to_string()],
            error_kind: Some(error.kind()),
        }
    }

    /// Returns the terminal state.
    #[must_use]
    pub fn status(&self) -> SendStatus {
        if self.is_success() {
            SendStatus::Sent
        } else {
            SendStatus::Failed
        }
    }

    /// Returns true if the message was sent.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.message_id.is_some() && self.errors.is_empty()
    }

    /// Provider message id (or local id on the direct path).
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Error messages, in the order they occurred.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Classification of the failure.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }
}

//! Outbound email model.

use super::{Address, Attachment};
use std::fmt;

/// Caller-assigned message priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// Urgent.
    High,
    /// Regular.
    Normal,
    /// Low urgency.
    Low,
    /// No priority given.
    #[default]
    Unspecified,
}

impl Priority {
    /// Parses a priority leniently; unknown values are `Unspecified`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" | "urgent" | "1" => Self::High,
            "normal" | "3" => Self::Normal,
            "low" | "5" => Self::Low,
            _ => Self::Unspecified,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
            Self::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// An email to deliver.
///
/// The sender only borrows the email; nothing in it is modified by a send.
#[derive(Debug, Clone, Default)]
pub struct OutboundEmail {
    /// Sender address, also the mailbox the message is sent from.
    pub from: Option<Address>,
    /// Recipient addresses.
    pub to: Vec<Address>,
    /// CC addresses.
    pub cc: Vec<Address>,
    /// BCC addresses.
    pub bcc: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// Subject line.
    pub subject: String,
    /// Body content.
    pub body: String,
    /// Whether `body` is HTML.
    pub is_html: bool,
    /// Priority.
    pub priority: Priority,
    /// Attachments, uploaded in this order.
    pub attachments: Vec<Attachment>,
}

impl OutboundEmail {
    /// Creates an empty email.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, address: impl Into<Address>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, address: impl Into<Address>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, address: impl Into<Address>) -> Self {
        self.cc.push(address.into());
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, address: impl Into<Address>) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Adds a Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, address: impl Into<Address>) -> Self {
        self.reply_to.push(address.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets a plain text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self.is_html = false;
        self
    }

    /// Sets an HTML body.
    #[must_use]
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self.is_html = true;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Appends an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Returns true if the email carries attachments.
    #[must_use]
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

//! Logical Graph mail operations.
//!
//! [`GraphTransport`] is the seam between the send pipeline and the network:
//! [`HttpTransport`] talks to Graph, tests substitute a recording mock.

mod http;

pub use http::{GRAPH_BASE_URL, HttpTransport};

use crate::error::Result;
use crate::graph::{AttachmentItem, FileAttachment, Message, UploadSession};
use crate::upload::ByteRange;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Provider answer to one uploaded chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkAck {
    /// More bytes expected; ranges as reported by the provider.
    Continue {
        /// Outstanding byte ranges (e.g., `"327680-"`).
        next_expected_ranges: Vec<String>,
    },
    /// The attachment is complete.
    Complete,
}

/// Mail operations against one provider.
///
/// `mailbox` is the user principal or email address owning the message.
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Creates a draft; the returned message carries the provider id.
    async fn create_draft(&self, mailbox: &str, message: &Message) -> Result<Message>;

    /// Adds a small attachment to an existing message.
    async fn add_attachment(
        &self,
        mailbox: &str,
        message_id: &str,
        attachment: &FileAttachment,
    ) -> Result<()>;

    /// Opens an upload session for a large attachment.
    async fn create_upload_session(
        &self,
        mailbox: &str,
        message_id: &str,
        item: &AttachmentItem,
    ) -> Result<UploadSession>;

    /// Uploads one chunk of a session.
    async fn upload_chunk(
        &self,
        session: &UploadSession,
        range: ByteRange,
        chunk: Bytes,
    ) -> Result<ChunkAck>;

    /// Sends an existing draft.
    async fn send_draft(&self, mailbox: &str, message_id: &str) -> Result<()>;

    /// Sends a message in one request. Returns the provider request id when
    /// one is reported.
    async fn send_mail(
        &self,
        mailbox: &str,
        message: &Message,
        save_to_sent_items: bool,
    ) -> Result<Option<String>>;

    /// Deletes a message (used to discard orphaned drafts).
    async fn delete_message(&self, mailbox: &str, message_id: &str) -> Result<()>;
}

#[async_trait]
impl<T: GraphTransport + ?Sized> GraphTransport for Arc<T> {
    async fn create_draft(&self, mailbox: &str, message: &Message) -> Result<Message> {
        (**self).create_draft(mailbox, message).await
    }

    async fn add_attachment(
        &self,
        mailbox: &str,
        message_id: &str,
        attachment: &FileAttachment,
    ) -> Result<()> {
        (**self).add_attachment(mailbox, message_id, attachment).await
    }

    async fn create_upload_session(
        &self,
        mailbox: &str,
        message_id: &str,
        item: &AttachmentItem,
    ) -> Result<UploadSession> {
        (**self).create_upload_session(mailbox, message_id, item).await
    }

    async fn upload_chunk(
        &self,
        session: &UploadSession,
        range: ByteRange,
        chunk: Bytes,
    ) -> Result<ChunkAck> {
        (**self).upload_chunk(session, range, chunk).await
    }

    async fn send_draft(&self, mailbox: &str, message_id: &str) -> Result<()> {
        (**self).send_draft(mailbox, message_id).await
    }

    async fn send_mail(
        &self,
        mailbox: &str,
        message: &Message,
        save_to_sent_items: bool,
    ) -> Result<Option<String>> {
        (**self).send_mail(mailbox, message, save_to_sent_items).await
    }

    async fn delete_message(&self, mailbox: &str, message_id: &str) -> Result<()> {
        (**self).delete_message(mailbox, message_id).await
    }
}

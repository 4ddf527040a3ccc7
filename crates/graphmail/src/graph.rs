//! Microsoft Graph wire types.
//!
//! Only the fields this crate reads or writes are modelled; unknown fields in
//! responses are ignored.

use crate::types::{Attachment, DEFAULT_CONTENT_TYPE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed upload chunk size for attachment upload sessions (320 KiB).
///
/// Graph requires chunk sizes that are multiples of 320 KiB.
pub const UPLOAD_CHUNK_SIZE: u64 = 320 * 1024;

/// Graph `emailAddress` resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Email address.
    #[serde(default)]
    pub address: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Graph `recipient` resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    /// Address of the recipient.
    pub email_address: EmailAddress,
}

/// Body content type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    /// Plain text.
    #[default]
    Text,
    /// HTML.
    Html,
}

/// Graph `itemBody` resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    /// Content type.
    #[serde(default)]
    pub content_type: BodyType,
    /// Content.
    #[serde(default)]
    pub content: String,
}

/// Message importance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// Low.
    Low,
    /// Normal.
    #[default]
    Normal,
    /// High.
    High,
}

/// Graph `message` resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Provider id, present once the message exists server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Subject.
    #[serde(default)]
    pub subject: String,
    /// Body.
    #[serde(default)]
    pub body: ItemBody,
    /// Importance.
    #[serde(default)]
    pub importance: Importance,
    /// Sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Recipient>,
    /// To recipients.
    #[serde(default)]
    pub to_recipients: Vec<Recipient>,
    /// CC recipients.
    #[serde(default)]
    pub cc_recipients: Vec<Recipient>,
    /// BCC recipients.
    #[serde(default)]
    pub bcc_recipients: Vec<Recipient>,
    /// Reply-To addresses.
    #[serde(default)]
    pub reply_to: Vec<Recipient>,
}

/// Graph `fileAttachment` resource, used for attachments under 3 MiB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    /// Filename.
    pub name: String,
    /// MIME type.
    pub content_type: String,
    /// Base64 encoded payload.
    pub content_bytes: String,
    /// Content id for inline references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    /// Inline flag.
    pub is_inline: bool,
    /// Payload size in bytes.
    pub size: u64,
}

impl FileAttachment {
    /// Builds a file attachment from an attachment's metadata and its
    /// base64 payload.
    #[must_use]
    pub fn new(attachment: &Attachment, content_bytes: String) -> Self {
        Self {
            odata_type: "#microsoft.graph.fileAttachment",
            name: attachment.filename.clone(),
            content_type: content_type_of(attachment),
            content_bytes,
            content_id: attachment.content_id.clone(),
            is_inline: attachment.is_inline,
            size: attachment.len(),
        }
    }
}

/// Graph `attachmentItem`, describing a large attachment for an upload
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentItem {
    attachment_type: &'static str,
    /// Filename.
    pub name: String,
    /// Declared size in bytes.
    pub size: u64,
    /// MIME type.
    pub content_type: String,
    /// Inline flag.
    pub is_inline: bool,
    /// Content id for inline references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

impl AttachmentItem {
    /// Describes an attachment; the size is its declared length.
    #[must_use]
    pub fn new(attachment: &Attachment) -> Self {
        Self {
            attachment_type: "file",
            name: attachment.filename.clone(),
            size: attachment.len(),
            content_type: content_type_of(attachment),
            is_inline: attachment.is_inline,
            content_id: attachment.content_id.clone(),
        }
    }
}

/// Declared MIME type, or the default when it is blank.
fn content_type_of(attachment: &Attachment) -> String {
    if attachment.content_type.trim().is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        attachment.content_type.clone()
    }
}

/// Body of `createUploadSession`.
#[derive(Debug, Serialize)]
pub(crate) struct CreateUploadSessionRequest<'a> {
    #[serde(rename = "AttachmentItem")]
    pub attachment_item: &'a AttachmentItem,
}

/// Response of `createUploadSession`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadSessionResponse {
    pub upload_url: String,
    #[serde(default)]
    pub expiration_date_time: Option<String>,
}

/// Response of an intermediate chunk upload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChunkProgress {
    #[serde(default)]
    pub next_expected_ranges: Vec<String>,
}

/// Body of `sendMail`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendMailRequest<'a> {
    pub message: &'a Message,
    pub save_to_sent_items: bool,
}

/// Graph error envelope: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// A provider-issued resumable upload handle for one attachment.
///
/// Not `Clone`: the uploader consumes it, so it cannot serve a second
/// attachment.
#[derive(Debug)]
pub struct UploadSession {
    /// Pre-authenticated upload URL.
    pub upload_url: String,
    /// Session expiry, when the provider reports one.
    pub expires_at: Option<DateTime<Utc>>,
    /// Declared attachment length.
    pub total_size: u64,
    /// Chunk size used for this session.
    pub chunk_size: u64,
}

impl UploadSession {
    /// Creates a session with the default chunk size.
    #[must_use]
    pub fn new(upload_url: impl Into<String>, total_size: u64) -> Self {
        Self {
            upload_url: upload_url.into(),
            expires_at: None,
            total_size,
            chunk_size: UPLOAD_CHUNK_SIZE,
        }
    }

    /// Sets the expiry.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub(crate) fn from_response(response: UploadSessionResponse, total_size: u64) -> Self {
        let expires_at = response
            .expiration_date_time
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Self {
            upload_url: response.upload_url,
            expires_at,
            total_size,
            chunk_size: UPLOAD_CHUNK_SIZE,
        }
    }
}

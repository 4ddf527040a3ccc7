//! Attachment upload strategies.
//!
//! Attachments below [`SMALL_ATTACHMENT_LIMIT`] are posted in one request.
//! Anything larger goes through an upload session in sequential
//! [`UPLOAD_CHUNK_SIZE`] chunks.

use crate::error::{Error, Result};
use crate::graph::{AttachmentItem, FileAttachment, UploadSession};
use crate::retry::RetryPolicy;
use crate::transport::{ChunkAck, GraphTransport};
use crate::types::Attachment;
use base64::Engine;
use bytes::Bytes;
use std::fmt;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use crate::graph::UPLOAD_CHUNK_SIZE;

/// Attachments of this many bytes or more use an upload session (3 MiB).
pub const SMALL_ATTACHMENT_LIMIT: u64 = 3 * 1024 * 1024;

/// How an attachment is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// One `add attachment` request.
    Single,
    /// Upload session with sequential chunks.
    Chunked,
}

impl UploadStrategy {
    /// Chooses the strategy for a payload length.
    #[must_use]
    pub const fn for_len(len: u64) -> Self {
        if len < SMALL_ATTACHMENT_LIMIT {
            Self::Single
        } else {
            Self::Chunked
        }
    }
}

/// Inclusive byte range of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false: a range holds at least one byte.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value for this range.
    #[must_use]
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Iterator over contiguous chunk ranges covering `0..total`.
#[derive(Debug, Clone)]
pub struct ChunkRanges {
    next: u64,
    total: u64,
    chunk_size: u64,
}

impl Iterator for ChunkRanges {
    type Item = ByteRange;

    fn next(&mut self) -> Option<ByteRange> {
        if self.next >= self.total {
            return None;
        }
        let start = self.next;
        let end = start.saturating_add(self.chunk_size).min(self.total) - 1;
        self.next = end + 1;
        Some(ByteRange { start, end })
    }
}

/// Splits `total` bytes into ranges of `chunk_size` (the last may be short).
///
/// A zero chunk size is treated as one byte.
#[must_use]
pub const fn chunk_ranges(total: u64, chunk_size: u64) -> ChunkRanges {
    ChunkRanges {
        next: 0,
        total,
        chunk_size: if chunk_size == 0 { 1 } else { chunk_size },
    }
}

/// Uploads attachments onto one existing message.
pub struct AttachmentUploader<'a, T: ?Sized> {
    transport: &'a T,
    retry: &'a RetryPolicy,
    cancel: &'a CancellationToken,
    mailbox: &'a str,
    message_id: &'a str,
}

impl<'a, T: GraphTransport + ?Sized> AttachmentUploader<'a, T> {
    /// Creates an uploader for `message_id` in `mailbox`.
    pub const fn new(
        transport: &'a T,
        retry: &'a RetryPolicy,
        cancel: &'a CancellationToken,
        mailbox: &'a str,
        message_id: &'a str,
    ) -> Self {
        Self {
            transport,
            retry,
            cancel,
            mailbox,
            message_id,
        }
    }

    /// Uploads one attachment with the strategy its length selects.
    ///
    /// # Errors
    ///
    /// Small path failures propagate unchanged; large path failures after
    /// the session exists are reported as `PartialUpload`. Cancellation is
    /// always `Cancelled`.
    pub async fn upload(&self, attachment: &Attachment) -> Result<UploadStrategy> {
        let strategy = UploadStrategy::for_len(attachment.len());
        debug!(
            name = %attachment.filename,
            len = attachment.len(),
            ?strategy,
            "uploading attachment"
        );

        match strategy {
            UploadStrategy::Single => self.upload_single(attachment).await?,
            UploadStrategy::Chunked => self.upload_chunked(attachment).await?,
        }
        Ok(strategy)
    }

    async fn upload_single(&self, attachment: &Attachment) -> Result<()> {
        let mut reader = attachment.open().await?.take(attachment.len());
        // Bounded by SMALL_ATTACHMENT_LIMIT.
        let mut payload = Vec::with_capacity(usize::try_from(attachment.len()).unwrap_or(0));
        reader.read_to_end(&mut payload).await?;

        if payload.len() as u64 != attachment.len() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "attachment '{}' ended after {} of {} bytes",
                    attachment.filename,
                    payload.len(),
                    attachment.len()
                ),
            )));
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(&payload);
        let file = &FileAttachment::new(attachment, encoded);

        let (transport, mailbox, message_id) = (self.transport, self.mailbox, self.message_id);
        self.retry
            .execute_unrepeatable(self.cancel, "add_attachment", move || {
                transport.add_attachment(mailbox, message_id, file)
            })
            .await
    }

    async fn upload_chunked(&self, attachment: &Attachment) -> Result<()> {
        let item = &AttachmentItem::new(attachment);

        let (transport, mailbox, message_id) = (self.transport, self.mailbox, self.message_id);
        let session = self
            .retry
            .execute(self.cancel, "create_upload_session", move || {
                transport.create_upload_session(mailbox, message_id, item)
            })
            .await?;

        self.upload_chunks(attachment, session).await
    }

    /// Streams the payload through `session`, consuming it.
    async fn upload_chunks(&self, attachment: &Attachment, session: UploadSession) -> Result<()> {
        let total = session.total_size;
        let mut uploaded = 0u64;
        let interrupted = |uploaded: u64, error: Error| match error {
            Error::Cancelled => Error::Cancelled,
            other => Error::PartialUpload {
                attachment: attachment.filename.clone(),
                uploaded,
                total,
                reason: other.to_string(),
            },
        };

        let mut reader = attachment
            .open()
            .await
            .map_err(|e| interrupted(uploaded, e))?;
        let session = &session;
        let transport = self.transport;
        let mut ranges = chunk_ranges(total, session.chunk_size).peekable();

        while let Some(range) = ranges.next() {
            let mut buf = vec![0u8; usize::try_from(range.len()).unwrap_or(0)];
            reader.read_exact(&mut buf).await.map_err(|e| {
                interrupted(
                    uploaded,
                    Error::Io(std::io::Error::new(
                        e.kind(),
                        format!("payload ended before byte {}: {e}", range.end),
                    )),
                )
            })?;
            let chunk = Bytes::from(buf);

            let ack = self
                .retry
                .execute(self.cancel, "upload_chunk", move || {
                    transport.upload_chunk(session, range, chunk.clone())
                })
                .await
                .map_err(|e| interrupted(uploaded, e))?;

            uploaded += range.len();
            debug!(range = %range, uploaded, total, "chunk accepted");

            let is_last = ranges.peek().is_none();
            match (ack, is_last) {
                (ChunkAck::Complete, true) => {}
                (ChunkAck::Continue { next_expected_ranges }, false) => {
                    let expected = range.end + 1;
                    match next_expected_start(&next_expected_ranges) {
                        Some(Ok(start)) if start != expected => {
                            return Err(interrupted(
                                uploaded,
                                Error::Protocol(format!(
                                    "provider expects byte {start} next, uploader is at {expected}"
                                )),
                            ));
                        }
                        Some(Err(raw)) => {
                            return Err(interrupted(
                                uploaded,
                                Error::Protocol(format!("unreadable next expected range '{raw}'")),
                            ));
                        }
                        _ => {}
                    }
                }
                (ChunkAck::Complete, false) => {
                    return Err(interrupted(
                        uploaded,
                        Error::Protocol("upload session closed before the final chunk".into()),
                    ));
                }
                (ChunkAck::Continue { next_expected_ranges }, true) => {
                    return Err(interrupted(
                        uploaded,
                        Error::Protocol(format!(
                            "provider still expects {next_expected_ranges:?} after the final chunk"
                        )),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Start offset of the first `nextExpectedRanges` entry (`"start-"` or
/// `"start-end"`). `None` when the provider reported no ranges.
fn next_expected_start(ranges: &[String]) -> Option<std::result::Result<u64, &str>> {
    let first = ranges.first()?;
    let start = first.split('-').next().unwrap_or_default().trim();
    Some(start.parse().map_err(|_| first.as_str()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strategy_boundary() {
        assert_eq!(UploadStrategy::for_len(0), UploadStrategy::Single);
        assert_eq!(UploadStrategy::for_len(3_145_727), UploadStrategy::Single);
        assert_eq!(UploadStrategy::for_len(3_145_728), UploadStrategy::Chunked);
        assert_eq!(UploadStrategy::for_len(50 * 1024 * 1024), UploadStrategy::Chunked);
    }

    #[test]
    fn test_five_mib_is_sixteen_chunks() {
        let ranges: Vec<_> = chunk_ranges(5 * 1024 * 1024, UPLOAD_CHUNK_SIZE).collect();
        assert_eq!(ranges.len(), 16);
        assert_eq!(ranges[0], ByteRange { start: 0, end: 327_679 });
        assert_eq!(ranges[15].end, 5 * 1024 * 1024 - 1);
        assert_eq!(ranges[15].len(), 5 * 1024 * 1024 - 15 * UPLOAD_CHUNK_SIZE);
    }

    #[test]
    fn test_exact_multiple_ends_with_full_chunk() {
        let ranges: Vec<_> = chunk_ranges(10 * UPLOAD_CHUNK_SIZE, UPLOAD_CHUNK_SIZE).collect();
        assert_eq!(ranges.len(), 10);
        assert_eq!(ranges[9].len(), UPLOAD_CHUNK_SIZE);
    }

    #[test]
    fn test_empty_total() {
        assert_eq!(chunk_ranges(0, UPLOAD_CHUNK_SIZE).count(), 0);
    }

    #[test]
    fn test_zero_chunk_size() {
        assert_eq!(chunk_ranges(3, 0).count(), 3);
    }

    #[test]
    fn test_content_range() {
        let range = ByteRange {
            start: 327_680,
            end: 655_359,
        };
        assert_eq!(range.content_range(4_000_000), "bytes 327680-655359/4000000");
        assert_eq!(range.to_string(), "327680-655359");
    }

    #[test]
    fn test_next_expected_start() {
        assert_eq!(next_expected_start(&[]), None);
        assert_eq!(next_expected_start(&["327680-".into()]), Some(Ok(327_680)));
        assert_eq!(
            next_expected_start(&["655360-983039".into(), "1000000-".into()]),
            Some(Ok(655_360))
        );
        assert_eq!(next_expected_start(&["x-".into()]), Some(Err("x-")));
    }

    proptest! {
        #[test]
        fn prop_chunks_cover_total(total in 0u64..20_000_000, chunk in 1u64..1_000_000) {
            let ranges: Vec<_> = chunk_ranges(total, chunk).collect();

            let sum: u64 = ranges.iter().map(ByteRange::len).sum();
            prop_assert_eq!(sum, total);
            prop_assert_eq!(ranges.len() as u64, total.div_ceil(chunk));

            let mut expected_start = 0;
            for range in &ranges {
                prop_assert_eq!(range.start, expected_start);
                prop_assert!(range.len() <= chunk);
                expected_start = range.end + 1;
            }

            if let Some(last) = ranges.last() {
                let remainder = total % chunk;
                let expected = if remainder == 0 { chunk } else { remainder };
                prop_assert_eq!(last.len(), expected);
            }
        }
    }
}

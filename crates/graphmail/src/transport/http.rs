//! `reqwest` implementation of [`GraphTransport`].

use super::{ChunkAck, GraphTransport};
use crate::auth::TokenSource;
use crate::error::{Error, Result};
use crate::graph::{
    AttachmentItem, ChunkProgress, CreateUploadSessionRequest, ErrorEnvelope, FileAttachment,
    Message, SendMailRequest, UploadSession, UploadSessionResponse,
};
use crate::upload::ByteRange;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Graph v1.0 endpoint.
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Header carrying Graph's request correlation id.
const REQUEST_ID: &str = "request-id";

/// Graph mail transport over HTTPS.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates a transport against the public Graph endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the default endpoint fails to parse.
    pub fn new(tokens: Arc<dyn TokenSource>) -> Result<Self> {
        Self::with_base_url(tokens, GRAPH_BASE_URL)
    }

    /// Creates a transport against a specific Graph endpoint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the URL cannot serve as a base.
    pub fn with_base_url(tokens: Arc<dyn TokenSource>, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::InvalidConfig(format!("graph base url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "graph base url cannot be a base: {base_url}"
            )));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            tokens,
        })
    }

    /// Replaces the HTTP client (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Builds `{base}/users/{mailbox}/{segments...}` with each segment
    /// percent-encoded.
    fn user_url(&self, mailbox: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidConfig("graph base url cannot be a base".into()))?
            .pop_if_empty()
            .push("users")
            .push(mailbox)
            .extend(segments);
        Ok(url)
    }

    async fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn execute(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// Executes a bearer-authorized request. A 401 drops the cached token so
    /// the next attempt fetches a fresh one.
    async fn execute_authorized(&self, request: RequestBuilder) -> Result<Response> {
        let result = Self::execute(request).await;
        if let Err(Error::Transport { status: 401, .. }) = &result {
            debug!("access token rejected, invalidating cached token");
            self.tokens.invalidate().await;
        }
        result
    }
}

/// Converts a non-success response into `Error::Transport`.
async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    let retry_after = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();

    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (
            status
                .canonical_reason()
                .unwrap_or("UnknownError")
                .to_string(),
            body,
        ),
    };

    Error::Transport {
        status: status.as_u16(),
        code,
        message,
        retry_after,
    }
}

/// Parses a `Retry-After` header given in seconds.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl GraphTransport for HttpTransport {
    async fn create_draft(&self, mailbox: &str, message: &Message) -> Result<Message> {
        let url = self.user_url(mailbox, &["mailFolders", "drafts", "messages"])?;
        debug!(mailbox, "creating draft");

        let request = self.authorized(Method::POST, url).await?.json(message);
        let response = self.execute_authorized(request).await?;
        Ok(response.json().await?)
    }

    async fn add_attachment(
        &self,
        mailbox: &str,
        message_id: &str,
        attachment: &FileAttachment,
    ) -> Result<()> {
        let url = self.user_url(mailbox, &["messages", message_id, "attachments"])?;
        debug!(mailbox, message_id, name = %attachment.name, size = attachment.size, "adding attachment");

        let request = self.authorized(Method::POST, url).await?.json(attachment);
        self.execute_authorized(request).await?;
        Ok(())
    }

    async fn create_upload_session(
        &self,
        mailbox: &str,
        message_id: &str,
        item: &AttachmentItem,
    ) -> Result<UploadSession> {
        let url = self.user_url(
            mailbox,
            &["messages", message_id, "attachments", "createUploadSession"],
        )?;
        debug!(mailbox, message_id, name = %item.name, size = item.size, "creating upload session");

        let request = self
            .authorized(Method::POST, url)
            .await?
            .json(&CreateUploadSessionRequest {
                attachment_item: item,
            });
        let response = self.execute_authorized(request).await?;
        let session: UploadSessionResponse = response.json().await?;
        Ok(UploadSession::from_response(session, item.size))
    }

    async fn upload_chunk(
        &self,
        session: &UploadSession,
        range: ByteRange,
        chunk: Bytes,
    ) -> Result<ChunkAck> {
        debug!(range = %range, total = session.total_size, "uploading chunk");

        // The upload URL embeds its own token; no bearer header.
        let request = self
            .client
            .put(session.upload_url.as_str())
            .header(CONTENT_RANGE, range.content_range(session.total_size))
            .header(CONTENT_LENGTH, chunk.len())
            .body(chunk);
        let response = Self::execute(request).await?;

        if response.status() == StatusCode::CREATED {
            return Ok(ChunkAck::Complete);
        }

        let body = response.bytes().await?;
        let progress = if body.is_empty() {
            ChunkProgress::default()
        } else {
            serde_json::from_slice(&body)?
        };
        Ok(ChunkAck::Continue {
            next_expected_ranges: progress.next_expected_ranges,
        })
    }

    async fn send_draft(&self, mailbox: &str, message_id: &str) -> Result<()> {
        let url = self.user_url(mailbox, &["messages", message_id, "send"])?;
        debug!(mailbox, message_id, "sending draft");

        let request = self
            .authorized(Method::POST, url)
            .await?
            .header(CONTENT_LENGTH, 0);
        self.execute_authorized(request).await?;
        Ok(())
    }

    async fn send_mail(
        &self,
        mailbox: &str,
        message: &Message,
        save_to_sent_items: bool,
    ) -> Result<Option<String>> {
        let url = self.user_url(mailbox, &["sendMail"])?;
        debug!(mailbox, save_to_sent_items, "sending mail");

        let request = self.authorized(Method::POST, url).await?.json(&SendMailRequest {
            message,
            save_to_sent_items,
        });
        let response = self.execute_authorized(request).await?;
        Ok(request_id(response.headers()))
    }

    async fn delete_message(&self, mailbox: &str, message_id: &str) -> Result<()> {
        let url = self.user_url(mailbox, &["messages", message_id])?;
        debug!(mailbox, message_id, "deleting message");

        let request = self.authorized(Method::DELETE, url).await?;
        self.execute_authorized(request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use reqwest::header::HeaderValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct CountingToken {
        invalidated: AtomicUsize,
    }

    #[async_trait]
    impl TokenSource for CountingToken {
        async fn access_token(&self) -> Result<String> {
            Ok("token".into())
        }

        async fn invalidate(&self) {
            self.invalidated.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Answers one request with an empty-bodied `status_line` and returns
    /// the base URL to reach it.
    async fn serve_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response =
                format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        format!("http://{addr}/v1.0")
    }

    async fn send_draft_against(status_line: &'static str) -> (Result<()>, usize) {
        let tokens = Arc::new(CountingToken::default());
        let base_url = serve_once(status_line).await;
        let transport = HttpTransport::with_base_url(tokens.clone(), &base_url).unwrap();

        let result = transport.send_draft("u@contoso.com", "draft-1").await;
        (result, tokens.invalidated.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_unauthorized_invalidates_token() {
        let (result, invalidated) = send_draft_against("HTTP/1.1 401 Unauthorized").await;

        assert!(matches!(result, Err(Error::Transport { status: 401, .. })));
        assert_eq!(invalidated, 1);
    }

    #[tokio::test]
    async fn test_forbidden_keeps_token() {
        let (result, invalidated) = send_draft_against("HTTP/1.1 403 Forbidden").await;

        assert!(matches!(result, Err(Error::Transport { status: 403, .. })));
        assert_eq!(invalidated, 0);
    }

    #[tokio::test]
    async fn test_accepted_send_draft() {
        let (result, invalidated) = send_draft_against("HTTP/1.1 202 Accepted").await;

        assert!(result.is_ok());
        assert_eq!(invalidated, 0);
    }

    fn transport() -> HttpTransport {
        HttpTransport::new(Arc::new(StaticToken::new("token"))).unwrap()
    }

    #[test]
    fn test_user_url() {
        let url = transport()
            .user_url("user@contoso.com", &["mailFolders", "drafts", "messages"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://graph.microsoft.com/v1.0/users/user@contoso.com/mailFolders/drafts/messages"
        );
    }

    #[test]
    fn test_user_url_encodes_segments() {
        let url = transport()
            .user_url("a b@contoso.com", &["messages", "AAMk/abc=", "send"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://graph.microsoft.com/v1.0/users/a%20b@contoso.com/messages/AAMk%2Fabc=/send"
        );
    }

    #[test]
    fn test_custom_base_url_with_trailing_slash() {
        let transport = HttpTransport::with_base_url(
            Arc::new(StaticToken::new("token")),
            "https://graph.microsoft.us/v1.0/",
        )
        .unwrap();
        let url = transport.user_url("u@x.com", &["sendMail"]).unwrap();
        assert_eq!(url.as_str(), "https://graph.microsoft.us/v1.0/users/u@x.com/sendMail");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpTransport::with_base_url(Arc::new(StaticToken::new("t")), "mailto:x@y.com"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(HttpTransport::with_base_url(Arc::new(StaticToken::new("t")), "not a url").is_err());
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_request_id_header() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID, HeaderValue::from_static("7e3b1b3e-1111-2222"));
        assert_eq!(request_id(&headers).as_deref(), Some("7e3b1b3e-1111-2222"));
    }
}

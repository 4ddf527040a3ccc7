//! Send orchestration.
//!
//! [`GraphSender`] picks one of two paths per email:
//!
//! - **No attachments**: a single `sendMail` request.
//! - **Attachments**: create a draft, upload every attachment in order, then
//!   send the draft.
//!
//! Every outcome, including validation and transport failures, is reported
//! as a [`SendResult`].

use crate::auth::TokenSource;
use crate::compose::compose;
use crate::config::GraphSenderOptions;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::transport::{GraphTransport, HttpTransport};
use crate::types::{OutboundEmail, SendResult};
use crate::upload::AttachmentUploader;
use async_trait::async_trait;
use graphmail_oauth::{Authority, ClientSecretCredential, OAuthClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Something that can deliver an [`OutboundEmail`].
#[async_trait]
pub trait Sender: Send + Sync {
    /// Sends `email`, stopping early if `cancel` fires.
    async fn send(&self, email: &OutboundEmail, cancel: &CancellationToken) -> SendResult;
}

/// Sends email through Microsoft Graph.
#[derive(Debug, Clone)]
pub struct GraphSender<T> {
    transport: T,
    save_sent_items: bool,
    delete_orphaned_drafts: bool,
    retry: RetryPolicy,
}

impl<T: GraphTransport> GraphSender<T> {
    /// Creates a sender over `transport` with default settings.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            save_sent_items: false,
            delete_orphaned_drafts: false,
            retry: RetryPolicy::default(),
        }
    }

    /// Sets whether single-request sends are saved to Sent Items.
    #[must_use]
    pub const fn with_save_sent_items(mut self, save: bool) -> Self {
        self.save_sent_items = save;
        self
    }

    /// Sets whether a draft left behind by a failed send is deleted.
    #[must_use]
    pub const fn with_delete_orphaned_drafts(mut self, delete: bool) -> Self {
        self.delete_orphaned_drafts = delete;
        self
    }

    /// Sets the per-call retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `email` and returns the provider message id.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. `InvalidAddress` is raised
    /// before any network call.
    pub async fn try_send(&self, email: &OutboundEmail, cancel: &CancellationToken) -> Result<String> {
        let message = compose(email)?;
        let mailbox = message
            .from
            .as_ref()
            .map(|r| r.email_address.address.as_str())
            .ok_or_else(|| Error::InvalidAddress("from address is required".into()))?;

        if email.has_attachments() {
            self.send_with_attachments(mailbox, email, &message, cancel).await
        } else {
            self.send_direct(mailbox, &message, cancel).await
        }
    }

    async fn send_direct(
        &self,
        mailbox: &str,
        message: &crate::graph::Message,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let transport = &self.transport;
        let save = self.save_sent_items;
        let request_id = self
            .retry
            .execute_unrepeatable(cancel, "send_mail", move || {
                transport.send_mail(mailbox, message, save)
            })
            .await?;

        Ok(request_id.unwrap_or_else(|| {
            let id = uuid::Uuid::new_v4().to_string();
            debug!(mailbox, id = %id, "no request id reported, using a local id");
            id
        }))
    }

    async fn send_with_attachments(
        &self,
        mailbox: &str,
        email: &OutboundEmail,
        message: &crate::graph::Message,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let transport = &self.transport;
        let draft = self
            .retry
            .execute_unrepeatable(cancel, "create_draft", move || {
                transport.create_draft(mailbox, message)
            })
            .await?;
        let draft_id = draft
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Protocol("created draft has no id".into()))?;
        debug!(mailbox, message_id = %draft_id, "draft created");

        match self.attach_and_send(mailbox, &draft_id, email, cancel).await {
            Ok(()) => Ok(draft_id),
            Err(err) => {
                self.discard_draft(mailbox, &draft_id).await;
                Err(err)
            }
        }
    }

    async fn attach_and_send(
        &self,
        mailbox: &str,
        draft_id: &str,
        email: &OutboundEmail,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let uploader = AttachmentUploader::new(&self.transport, &self.retry, cancel, mailbox, draft_id);
        for attachment in &email.attachments {
            uploader.upload(attachment).await?;
        }

        let transport = &self.transport;
        self.retry
            .execute_unrepeatable(cancel, "send_draft", move || {
                transport.send_draft(mailbox, draft_id)
            })
            .await
    }

    /// Handles a draft left behind by a failed send.
    async fn discard_draft(&self, mailbox: &str, draft_id: &str) {
        if !self.delete_orphaned_drafts {
            warn!(mailbox, message_id = draft_id, "send failed, draft left in mailbox");
            return;
        }

        // Runs even when the send was cancelled.
        match self.transport.delete_message(mailbox, draft_id).await {
            Ok(()) => debug!(mailbox, message_id = draft_id, "orphaned draft deleted"),
            Err(err) => warn!(
                mailbox,
                message_id = draft_id,
                error = %err,
                "failed to delete orphaned draft"
            ),
        }
    }

    /// Sends `email` on a private current-thread runtime.
    ///
    /// Called from within an async context it fails with `InvalidConfig`
    /// instead of blocking the runtime.
    pub fn send_blocking(&self, email: &OutboundEmail) -> SendResult {
        if tokio::runtime::Handle::try_current().is_ok() {
            let err = Error::InvalidConfig(
                "send_blocking called inside an async runtime; use Sender::send".into(),
            );
            warn!(error = %err, "email not sent");
            return SendResult::failed(&err);
        }

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => return SendResult::failed(&Error::Io(err)),
        };
        runtime.block_on(self.send(email, &CancellationToken::new()))
    }
}

impl GraphSender<HttpTransport> {
    /// Builds a sender from configuration: client-credentials token
    /// source, HTTP transport and retry policy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the options are incomplete, or an error
    /// building the HTTP client or authority.
    pub fn from_options(options: &GraphSenderOptions) -> Result<Self> {
        options.validate()?;

        let http = reqwest::Client::builder()
            .timeout(options.request_timeout())
            .build()?;

        let authority = Authority::microsoft_with_host(&options.authority_url, &options.tenant_id)?;
        let client = OAuthClient::new(options.app_id.clone(), options.secret.clone(), authority)
            .with_http_client(http.clone());
        let tokens: Arc<dyn TokenSource> = Arc::new(ClientSecretCredential::new(client));

        let transport =
            HttpTransport::with_base_url(tokens, &options.graph_base_url)?.with_http_client(http);

        Ok(Self::new(transport)
            .with_save_sent_items(options.save_sent_items)
            .with_delete_orphaned_drafts(options.delete_orphaned_drafts)
            .with_retry(options.retry_policy()))
    }
}

#[async_trait]
impl<T: GraphTransport> Sender for GraphSender<T> {
    async fn send(&self, email: &OutboundEmail, cancel: &CancellationToken) -> SendResult {
        let attachments = email.attachments.len();
        match self.try_send(email, cancel).await {
            Ok(id) => {
                info!(message_id = %id, attachments, "email sent");
                SendResult::sent(id)
            }
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), attachments, "email not sent");
                SendResult::failed(&err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_options_rejects_incomplete() {
        let result = GraphSender::from_options(&GraphSenderOptions::new("tenant", "", "secret"));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_options_applies_settings() {
        let options = GraphSenderOptions::new("tenant", "app", "secret")
            .with_save_sent_items(true)
            .with_delete_orphaned_drafts(true);

        let sender = GraphSender::from_options(&options).unwrap();
        assert!(sender.save_sent_items);
        assert!(sender.delete_orphaned_drafts);
        assert_eq!(sender.retry, RetryPolicy::default());
    }

    #[test]
    fn test_from_options_bad_base_url() {
        let mut options = GraphSenderOptions::new("tenant", "app", "secret");
        options.graph_base_url = "mailto:nobody@example.com".into();
        assert!(matches!(
            GraphSender::from_options(&options),
            Err(Error::InvalidConfig(_))
        ));
    }
}

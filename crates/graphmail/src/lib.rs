//! # graphmail
//!
//! Send email through the Microsoft Graph mail API.
//!
//! ## Features
//!
//! - **Two send paths**: one `sendMail` request for plain messages, draft +
//!   attachments + send when attachments are present
//! - **Size-aware uploads**: attachments under 3 MiB are posted inline,
//!   larger ones go through a resumable upload session in 320 KiB chunks
//! - **Result values**: every send ends in a [`SendResult`], never a panic
//! - **Retry and cancellation**: bounded backoff for throttling and server
//!   errors, a [`CancellationToken`] observed at every network call
//! - **Pluggable transport**: [`GraphTransport`] for tests and alternative
//!   HTTP stacks
//!
//! ## Quick Start
//!
//! ```ignore
//! use graphmail::{CancellationToken, GraphSender, GraphSenderOptions, OutboundEmail, Sender};
//!
//! #[tokio::main]
//! async fn main() -> graphmail::Result<()> {
//!     let options = GraphSenderOptions::new("tenant-id", "app-id", "secret");
//!     let sender = GraphSender::from_options(&options)?;
//!
//!     let email = OutboundEmail::new()
//!         .from("noreply@contoso.com")
//!         .to("someone@example.com")
//!         .subject("Hello")
//!         .html_body("<p>Hello from Graph</p>");
//!
//!     let result = sender.send(&email, &CancellationToken::new()).await;
//!     println!("{:?}: {:?}", result.status(), result.message_id());
//!     Ok(())
//! }
//! ```
//!
//! ## Send Flow
//!
//! ```text
//! compose ──┬── no attachments ──→ sendMail
//!           │
//!           └── attachments ──→ create draft ──→ upload each ──→ send draft
//!                                                  │
//!                                                  ├── < 3 MiB: add attachment
//!                                                  └── ≥ 3 MiB: upload session + chunks
//! ```
//!
//! ## Modules
//!
//! - [`compose`]: email model to Graph message mapping
//! - [`upload`]: attachment upload strategies
//! - [`sender`]: send orchestration
//! - [`transport`]: Graph operations and the HTTP implementation
//! - [`config`]: sender options

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod compose;
pub mod config;
mod error;
pub mod graph;
pub mod retry;
pub mod sender;
pub mod transport;
pub mod types;
pub mod upload;

pub use auth::{StaticToken, TokenSource};
pub use config::{GraphSenderOptions, RetryOptions};
pub use error::{Error, ErrorKind, Result};
pub use retry::RetryPolicy;
pub use sender::{GraphSender, Sender};
pub use tokio_util::sync::CancellationToken;
pub use transport::{ChunkAck, GraphTransport, HttpTransport};
pub use types::{
    Address, Attachment, AttachmentData, OutboundEmail, Priority, SendResult, SendStatus,
};
pub use upload::{AttachmentUploader, ByteRange, UploadStrategy, chunk_ranges};

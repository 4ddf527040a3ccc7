//! Core email types.

mod address;
mod attachment;
mod email;
mod result;

pub use address::Address;
pub use attachment::{Attachment, AttachmentData, DEFAULT_CONTENT_TYPE};
pub use email::{OutboundEmail, Priority};
pub use result::{SendResult, SendStatus};

//! Translation of [`OutboundEmail`] into a Graph [`Message`].
//!
//! Everything here is pure: no I/O, no attachments.

use crate::error::{Error, Result};
use crate::graph::{BodyType, EmailAddress, Importance, ItemBody, Message, Recipient};
use crate::types::{Address, OutboundEmail, Priority};

/// Converts a required address into a recipient.
///
/// # Errors
///
/// Returns `InvalidAddress` if the address is absent or malformed.
pub fn to_recipient(address: Option<&Address>) -> Result<Recipient> {
    let address =
        address.ok_or_else(|| Error::InvalidAddress("required address is missing".into()))?;
    address.validate()?;
    Ok(recipient(address))
}

/// Converts an address list, preserving order. An absent list is empty.
#[must_use]
pub fn to_recipient_list(addresses: Option<&[Address]>) -> Vec<Recipient> {
    addresses
        .unwrap_or_default()
        .iter()
        .map(recipient)
        .collect()
}

fn recipient(address: &Address) -> Recipient {
    Recipient {
        email_address: EmailAddress {
            address: address.email.trim().to_string(),
            name: address.name.clone(),
        },
    }
}

/// Maps a priority to Graph importance; unspecified maps to normal.
#[must_use]
pub const fn importance_for(priority: Priority) -> Importance {
    match priority {
        Priority::High => Importance::High,
        Priority::Low => Importance::Low,
        Priority::Normal | Priority::Unspecified => Importance::Normal,
    }
}

/// Builds the provider message for an email. The result has no id.
///
/// # Errors
///
/// Returns `InvalidAddress` if the from address is absent or malformed.
pub fn compose(email: &OutboundEmail) -> Result<Message> {
    let from = to_recipient(email.from.as_ref())
        .map_err(|e| Error::InvalidAddress(format!("from: {}", invalid_reason(e))))?;

    Ok(Message {
        id: None,
        subject: email.subject.clone(),
        body: ItemBody {
            content_type: if email.is_html {
                BodyType::Html
            } else {
                BodyType::Text
            },
            content: email.body.clone(),
        },
        importance: importance_for(email.priority),
        from: Some(from),
        to_recipients: to_recipient_list(Some(email.to.as_slice())),
        cc_recipients: to_recipient_list(Some(email.cc.as_slice())),
        bcc_recipients: to_recipient_list(Some(email.bcc.as_slice())),
        reply_to: to_recipient_list(Some(email.reply_to.as_slice())),
    })
}

fn invalid_reason(error: Error) -> String {
    match error {
        Error::InvalidAddress(reason) => reason,
        other => other.to_string(),
    }
}

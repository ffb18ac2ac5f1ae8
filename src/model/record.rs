//! The email record consumed by the core, and the accessor trait hosts implement.

use chrono::NaiveDateTime;

use super::address::EmailAddress;
use crate::error::Result;

/// How a recipient was addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RecipientKind {
    To,
    Cc,
}

/// A single recipient of a message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Recipient {
    pub address: EmailAddress,
    pub kind: RecipientKind,
}

/// An attachment carried by a message, with its decoded content.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name as declared by the sender (unsanitized).
    pub file_name: String,
    /// Decoded bytes.
    pub data: Vec<u8>,
}

/// Read access to a message owned by a mail host.
///
/// Every getter may fail (`Err`, the host could not produce the property) or
/// report an absent value (`Ok(None)`). Callers treat both as "unknown" and
/// fall back.
pub trait MailMetadata {
    fn subject(&self) -> Result<Option<String>>;
    fn conversation_topic(&self) -> Result<Option<String>>;
    /// Raw binary conversation index (Outlook `PR_CONVERSATION_INDEX`).
    fn conversation_index(&self) -> Result<Option<Vec<u8>>>;
    /// Received time as local wall-clock time.
    fn received(&self) -> Result<Option<NaiveDateTime>>;
    fn sender(&self) -> Result<Option<EmailAddress>>;
    fn recipients(&self) -> Result<Vec<Recipient>>;
    fn internet_message_id(&self) -> Result<Option<String>>;
    fn entry_id(&self) -> Result<Option<String>>;
    fn body(&self) -> Result<Option<String>>;
    fn attachments(&self) -> Result<Vec<Attachment>>;
}

/// A snapshot of a message, detached from its host.
#[derive(Debug, Clone, Default)]
pub struct EmailRecord {
    pub subject: String,
    pub conversation_topic: Option<String>,
    pub conversation_index: Option<Vec<u8>>,
    pub received: Option<NaiveDateTime>,
    pub sender: EmailAddress,
    pub recipients: Vec<Recipient>,
    pub internet_message_id: Option<String>,
    pub entry_id: Option<String>,
    pub body: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl EmailRecord {
    /// Copy every readable property out of a host record.
    ///
    /// Properties the host fails to produce are logged and left empty.
    pub fn capture(source: &dyn MailMetadata) -> Self {
        Self {
            subject: optional("subject", source.subject())
                .flatten()
                .unwrap_or_default(),
            conversation_topic: optional("conversation_topic", source.conversation_topic())
                .flatten(),
            conversation_index: optional("conversation_index", source.conversation_index())
                .flatten(),
            received: optional("received", source.received()).flatten(),
            sender: optional("sender", source.sender())
                .flatten()
                .unwrap_or_default(),
            recipients: optional("recipients", source.recipients()).unwrap_or_default(),
            internet_message_id: optional("internet_message_id", source.internet_message_id())
                .flatten(),
            entry_id: optional("entry_id", source.entry_id()).flatten(),
            body: optional("body", source.body()).flatten(),
            attachments: optional("attachments", source.attachments()).unwrap_or_default(),
        }
    }

    /// Recipients of the given kind, in order.
    pub fn recipients_of(&self, kind: RecipientKind) -> impl Iterator<Item = &EmailAddress> {
        self.recipients
            .iter()
            .filter(move |r| r.kind == kind)
            .map(|r| &r.address)
    }

    /// The first `To` recipient, falling back to any recipient.
    pub fn primary_recipient(&self) -> Option<&EmailAddress> {
        self.recipients_of(RecipientKind::To)
            .next()
            .or_else(|| self.recipients.first().map(|r| &r.address))
    }
}

fn optional<T>(property: &'static str, value: Result<T>) -> Option<T> {
    match value {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!(property, error = %e, "Mail property unavailable");
            None
        }
    }
}

impl MailMetadata for EmailRecord {
    fn subject(&self) -> Result<Option<String>> {
        Ok(Some(self.subject.clone()))
    }

    fn conversation_topic(&self) -> Result<Option<String>> {
        Ok(self.conversation_topic.clone())
    }

    fn conversation_index(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.conversation_index.clone())
    }

    fn received(&self) -> Result<Option<NaiveDateTime>> {
        Ok(self.received)
    }

    fn sender(&self) -> Result<Option<EmailAddress>> {
        Ok(Some(self.sender.clone()))
    }

    fn recipients(&self) -> Result<Vec<Recipient>> {
        Ok(self.recipients.clone())
    }

    fn internet_message_id(&self) -> Result<Option<String>> {
        Ok(self.internet_message_id.clone())
    }

    fn entry_id(&self) -> Result<Option<String>> {
        Ok(self.entry_id.clone())
    }

    fn body(&self) -> Result<Option<String>> {
        Ok(self.body.clone())
    }

    fn attachments(&self) -> Result<Vec<Attachment>> {
        Ok(self.attachments.clone())
    }
}

//! Host accessor backed by `.eml` files (RFC 5322 messages).
//!
//! Outlook exposes its conversation metadata in MIME headers as well:
//! `Thread-Topic` carries the conversation topic and `Thread-Index` the
//! base64-encoded conversation index.

use std::path::Path;

use base64::Engine;
use chrono::{DateTime, Local, NaiveDateTime};
use mail_parser::{Address, MessageParser, MimeHeaders};

use crate::error::{NoteError, Result};
use crate::model::address::EmailAddress;
use crate::model::record::{Attachment, EmailRecord, Recipient, RecipientKind};

/// Parse an `.eml` file into an [`EmailRecord`].
pub fn parse_eml(path: impl AsRef<Path>) -> Result<EmailRecord> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| NoteError::io(path, e))?;
    parse_eml_bytes(&data).ok_or_else(|| NoteError::InvalidMessage(path.to_path_buf()))
}

/// Parse raw message bytes. Returns `None` if the bytes are not a message.
pub fn parse_eml_bytes(data: &[u8]) -> Option<EmailRecord> {
    let msg = MessageParser::default().parse(data)?;

    let received = msg.date().and_then(|d| local_time(d.to_timestamp()));
    let sender = msg
        .from()
        .and_then(|a| addresses(a).into_iter().next())
        .unwrap_or_default();

    let mut recipients = Vec::new();
    for (header, kind) in [(msg.to(), RecipientKind::To), (msg.cc(), RecipientKind::Cc)] {
        if let Some(list) = header {
            recipients.extend(
                addresses(list)
                    .into_iter()
                    .map(|address| Recipient { address, kind }),
            );
        }
    }

    let attachments = msg
        .attachments()
        .enumerate()
        .map(|(i, part)| Attachment {
            file_name: part
                .attachment_name()
                .map(String::from)
                .unwrap_or_else(|| format!("attachment_{}", i + 1)),
            data: part.contents().to_vec(),
        })
        .collect();

    Some(EmailRecord {
        subject: msg.subject().unwrap_or_default().trim().to_string(),
        conversation_topic: msg
            .header_raw("Thread-Topic")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        conversation_index: msg.header_raw("Thread-Index").and_then(decode_thread_index),
        received,
        sender,
        recipients,
        internet_message_id: msg.message_id().map(|id| format!("<{}>", id.trim())),
        entry_id: None,
        body: msg.body_text(0).map(|b| b.into_owned()),
        attachments,
    })
}

/// Decode an Outlook `Thread-Index` header.
fn decode_thread_index(raw: &str) -> Option<Vec<u8>> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match base64::engine::general_purpose::STANDARD.decode(compact) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed Thread-Index header");
            None
        }
    }
}

fn local_time(timestamp: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(timestamp, 0).map(|utc| utc.with_timezone(&Local).naive_local())
}

fn addresses(list: &Address<'_>) -> Vec<EmailAddress> {
    list.iter()
        .map(|a| EmailAddress::new(a.name().unwrap_or_default(), a.address().unwrap_or_default()))
        .filter(|a| !a.is_empty())
        .collect()
}

//! Markdown rendering of email and contact notes.

use chrono::{Duration, NaiveDateTime};

use super::filename::contact_name;
use super::frontmatter::{FrontMatterBuilder, DATE_FORMAT};
use crate::config::TasksConfig;
use crate::model::address::EmailAddress;
use crate::model::record::{EmailRecord, RecipientKind};
use crate::thread::identity::ConversationId;

/// Everything needed to render one email note.
#[derive(Debug)]
pub struct EmailNote<'a> {
    pub record: &'a EmailRecord,
    pub thread_id: &'a ConversationId,
    pub received: NaiveDateTime,
    /// Vault-relative link of the note itself.
    pub link_path: &'a str,
    /// Vault-relative links of the saved attachments.
    pub attachments: &'a [String],
}

fn wiki_link(address: &EmailAddress) -> String {
    format!("[[{}]]", contact_name(address))
}

/// Render the markdown of an email note.
pub fn render_email(note: &EmailNote<'_>, tasks: &TasksConfig) -> String {
    let record = note.record;
    let to: Vec<String> = record.recipients_of(RecipientKind::To).map(wiki_link).collect();
    let cc: Vec<String> = record.recipients_of(RecipientKind::Cc).map(wiki_link).collect();
    let title = if record.subject.trim().is_empty() {
        "(no subject)"
    } else {
        record.subject.trim()
    };

    let mut content = FrontMatterBuilder::new()
        .field("title", title)
        .field("threadId", note.thread_id.as_str())
        .date(note.received)
        .field("from", &wiki_link(&record.sender))
        .list("to", &to)
        .list("cc", &cc)
        .optional("internetMessageId", record.internet_message_id.as_deref())
        .optional("entryId", record.entry_id.as_deref())
        .list("tags", ["email"])
        .build();

    content.push_str(&format!("\n# {title}\n\n"));
    content.push_str(&format!("**From:** {}\n", record.sender.display()));
    if !to.is_empty() {
        content.push_str(&format!("**To:** {}\n", to.join(", ")));
    }
    if !cc.is_empty() {
        content.push_str(&format!("**Cc:** {}\n", cc.join(", ")));
    }
    content.push_str(&format!("**Date:** {}\n", note.received.format(DATE_FORMAT)));
    content.push_str("\n---\n\n");

    if let Some(body) = record.body.as_deref().filter(|b| !b.trim().is_empty()) {
        content.push_str(body.trim_end());
        content.push('\n');
    }

    if !note.attachments.is_empty() {
        content.push_str("\n## Attachments\n\n");
        for link in note.attachments {
            content.push_str(&format!("- ![[{link}]]\n"));
        }
    }

    if tasks.create_follow_up_task {
        let due = Duration::try_days(tasks.follow_up_days)
            .and_then(|days| note.received.date().checked_add_signed(days));
        match due {
            Some(due) => {
                content.push_str("\n## Tasks\n\n");
                content.push_str(&format!(
                    "- [ ] Follow up: [[{}]] 📅 {}\n",
                    note.link_path,
                    due.format("%Y-%m-%d")
                ));
            }
            None => tracing::warn!(
                follow_up_days = tasks.follow_up_days,
                "Follow-up date out of range, skipping task"
            ),
        }
    }

    content
}

/// Render a new contact note.
pub fn render_contact(address: &EmailAddress) -> String {
    let name = contact_name(address);
    let mut content = FrontMatterBuilder::new()
        .field("title", &name)
        .optional("email", Some(address.address.as_str()))
        .field("type", "contact")
        .list("tags", ["contact"])
        .build();
    content.push_str(&format!("\n# {name}\n\n"));
    if !address.address.is_empty() {
        content.push_str(&format!("- Email: <{}>\n", address.address));
    }
    content
}

//! Turning one mail record into notes in the vault.
//!
//! Pipeline per message: duplicate check, conversation id, thread lookup,
//! path planning, then writing the note, its attachments, the thread
//! summary and any missing contact notes. Everything that touches a thread
//! folder runs under that folder's lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};

use crate::cancel::CancellationToken;
use crate::context::ProcessingContext;
use crate::error::{NoteError, Result};
use crate::fsutil;
use crate::model::plan::{link_path, NotePlan};
use crate::model::record::{EmailRecord, MailMetadata};
use crate::note::filename::{clean_file_name, contact_name, short_name};
use crate::note::planner::{split_ordinal, Grouping, NotePlanner, NoteRequest, EXTENSION};
use crate::note::render::{render_contact, render_email, EmailNote};
use crate::note::resuffix::{resuffix, Reservation};
use crate::thread::identity::{normalize_subject, resolve_with_strategy, ConversationId};
use crate::thread::lookup::{self, ThreadLocation};
use crate::thread::summary::write_summary;

/// Attachment names are cut to this many characters.
const MAX_ATTACHMENT_NAME: usize = 120;

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A note with the same message id already exists; nothing was written.
    Duplicate,
    Written(WrittenNote),
}

/// Files produced for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenNote {
    /// Where the note was written (after any rename to avoid overwriting).
    pub plan: NotePlan,
    pub conversation_id: ConversationId,
    pub attachments: Vec<PathBuf>,
    /// Thread summary, for grouped notes.
    pub summary: Option<PathBuf>,
    /// Contact notes created for this message.
    pub contacts: Vec<PathBuf>,
}

/// Process one message.
///
/// Errors are logged here and returned; the caller decides whether to show
/// them. Cancellation is checked between stages and leaves already written
/// files in place.
pub fn process_email(
    ctx: &ProcessingContext,
    mail: &dyn MailMetadata,
    token: &CancellationToken,
) -> Result<ProcessOutcome> {
    let result = run(ctx, mail, token);
    match &result {
        Ok(ProcessOutcome::Duplicate) => {}
        Ok(ProcessOutcome::Written(note)) => {
            tracing::info!(
                path = %note.plan.path().display(),
                thread = %note.conversation_id,
                grouped = note.plan.is_grouped,
                "Wrote email note"
            );
        }
        Err(NoteError::Cancelled) => tracing::info!("Processing cancelled"),
        Err(e) => tracing::error!(error = %e, "Failed to process email"),
    }
    result
}

/// Process several messages concurrently, one thread each.
///
/// Results are returned in input order.
pub fn process_batch(
    ctx: &Arc<ProcessingContext>,
    mails: &[EmailRecord],
    token: &CancellationToken,
) -> Vec<Result<ProcessOutcome>> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = mails
            .iter()
            .map(|mail| {
                let ctx = Arc::clone(ctx);
                let token = token.clone();
                scope.spawn(move || process_email(&ctx, mail, &token))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}

fn run(
    ctx: &ProcessingContext,
    mail: &dyn MailMetadata,
    token: &CancellationToken,
) -> Result<ProcessOutcome> {
    let config = &ctx.config;
    let record = EmailRecord::capture(mail);
    let message_id = record.internet_message_id.as_deref().unwrap_or_default();
    let entry_id = record.entry_id.as_deref().unwrap_or_default();
    token.check()?;

    if config.dedup.enabled && ctx.id_cache.is_duplicate(message_id, entry_id)? {
        tracing::info!(message_id, entry_id, "Skipping email already in the vault");
        return Ok(ProcessOutcome::Duplicate);
    }

    let (conversation_id, strategy) = resolve_with_strategy(mail);
    tracing::debug!(thread = %conversation_id, ?strategy, "Resolved conversation id");

    let received = record.received.unwrap_or_else(|| {
        tracing::warn!("Email has no received time, using now");
        Local::now().naive_local()
    });
    let request = note_request(ctx, &record, received);

    let inbox = config.vault.inbox_dir();
    std::fs::create_dir_all(&inbox).map_err(|e| NoteError::io(&inbox, e))?;
    token.check()?;

    let location = if config.threads.group_threads {
        lookup::locate(
            &inbox,
            &conversation_id,
            &record.subject,
            config.notes.max_subject_length,
        )?
    } else {
        None
    };

    let job = NoteJob {
        ctx,
        record: &record,
        conversation_id: &conversation_id,
        request: &request,
        inbox: &inbox,
        token,
    };
    let mut written = match location {
        Some(location) => ctx
            .folder_locks
            .with_folder(&location.folder, || job.write_threaded(&location))?,
        None => job.write_single()?,
    };

    if config.contacts.create_contact_notes {
        written.contacts = write_contacts(ctx, &record);
    }

    ctx.id_cache.record_processed(message_id, entry_id);
    Ok(ProcessOutcome::Written(written))
}

fn note_request(ctx: &ProcessingContext, record: &EmailRecord, received: NaiveDateTime) -> NoteRequest {
    let notes = &ctx.config.notes;
    let subject = clean_file_name(&normalize_subject(&record.subject), notes.max_subject_length);
    NoteRequest {
        subject,
        sender: short_name(&record.sender),
        recipient: record.primary_recipient().map(short_name).unwrap_or_default(),
        received,
        outgoing: ctx.config.threads.is_own_address(&record.sender.address),
    }
}

/// One message on its way into the vault.
struct NoteJob<'a> {
    ctx: &'a ProcessingContext,
    record: &'a EmailRecord,
    conversation_id: &'a ConversationId,
    request: &'a NoteRequest,
    inbox: &'a Path,
    token: &'a CancellationToken,
}

impl NoteJob<'_> {
    fn planner(&self) -> NotePlanner<'_> {
        NotePlanner::new(&self.ctx.config.notes, &self.ctx.config.vault.root)
    }

    fn write_single(&self) -> Result<WrittenNote> {
        let plan = self.planner().plan(self.request, self.inbox, &Grouping::Single)?;
        self.token.check()?;
        let (plan, attachments) = self.write_note(plan)?;
        Ok(WrittenNote {
            plan,
            conversation_id: self.conversation_id.clone(),
            attachments,
            summary: None,
            contacts: Vec::new(),
        })
    }

    /// Caller holds the lock of `location.folder`.
    fn write_threaded(&self, location: &ThreadLocation) -> Result<WrittenNote> {
        let folder = &location.folder;
        std::fs::create_dir_all(folder).map_err(|e| NoteError::io(folder, e))?;

        // Re-read under the lock: another message may have moved notes since.
        for member in lookup::find_members(self.inbox, self.conversation_id)? {
            if !member.is_unthreaded(self.inbox) {
                continue;
            }
            match fsutil::move_into(&member.path, folder) {
                Ok(moved) => {
                    tracing::info!(from = %member.path.display(), to = %moved.display(), "Moved note into thread folder");
                }
                Err(e) => {
                    tracing::warn!(path = %member.path.display(), error = %e, "Could not move note into thread folder");
                }
            }
        }
        self.token.check()?;

        let grouping = Grouping::Thread {
            folder: folder.clone(),
            thread_name: location.thread_name.clone(),
        };
        let plan = self.planner().plan(self.request, self.inbox, &grouping)?;

        if !self.ctx.config.notes.include_date_in_title {
            let (base, _) = split_ordinal(&plan.file_name_no_extension);
            resuffix(
                folder,
                Some(Reservation {
                    base,
                    received: self.request.received,
                }),
            )?;
        }
        self.token.check()?;

        let (plan, attachments) = self.write_note(plan)?;
        let summary = write_summary(
            folder,
            &location.thread_name,
            self.conversation_id,
            &self.ctx.config.vault.root,
        )?;
        Ok(WrittenNote {
            plan,
            conversation_id: self.conversation_id.clone(),
            attachments,
            summary: Some(summary),
            contacts: Vec::new(),
        })
    }

    /// Save attachments, then the note itself. Never overwrites.
    fn write_note(&self, plan: NotePlan) -> Result<(NotePlan, Vec<PathBuf>)> {
        let (attachments, links) = self.save_attachments(&plan.folder_path)?;
        let tasks = &self.ctx.config.tasks;

        let render = |plan: &NotePlan| {
            render_email(
                &EmailNote {
                    record: self.record,
                    thread_id: self.conversation_id,
                    received: self.request.received,
                    link_path: &plan.link_path,
                    attachments: &links,
                },
                tasks,
            )
        };

        let planned = plan.path();
        let actual = fsutil::write_new_file(&planned, render(&plan).as_bytes())?;
        if actual == planned {
            return Ok((plan, attachments));
        }

        // The note links to itself from its follow-up task.
        let plan = plan.renamed(&actual, &self.ctx.config.vault.root);
        if tasks.create_follow_up_task {
            fsutil::write_file(&actual, render(&plan).as_bytes())?;
        }
        Ok((plan, attachments))
    }

    /// Write attachments next to the note. Failures skip the attachment.
    fn save_attachments(&self, folder: &Path) -> Result<(Vec<PathBuf>, Vec<String>)> {
        if self.record.attachments.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        let vault = &self.ctx.config.vault;
        let dir = folder.join(&vault.attachments_folder);
        std::fs::create_dir_all(&dir).map_err(|e| NoteError::io(&dir, e))?;

        let mut paths = Vec::new();
        let mut links = Vec::new();
        for attachment in &self.record.attachments {
            let name = clean_file_name(&attachment.file_name, MAX_ATTACHMENT_NAME);
            let path = fsutil::unique_path(&dir.join(&name));
            match fsutil::write_new_file(&path, &attachment.data) {
                Ok(path) => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or(name);
                    links.push(link_path(&vault.root, &dir, &file_name));
                    paths.push(path);
                }
                Err(e) => {
                    tracing::warn!(file = %attachment.file_name, error = %e, "Could not save attachment");
                }
            }
        }
        Ok((paths, links))
    }
}

/// Create a note for every participant that has none yet.
///
/// The vault owner's own addresses are skipped. Failures are logged.
fn write_contacts(ctx: &ProcessingContext, record: &EmailRecord) -> Vec<PathBuf> {
    let dir = ctx.config.vault.contacts_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "Could not create contacts folder");
        return Vec::new();
    }

    let participants = std::iter::once(&record.sender)
        .chain(record.recipients.iter().map(|r| &r.address))
        .filter(|a| !a.is_empty() && !ctx.config.threads.is_own_address(&a.address));

    let mut created = Vec::new();
    for address in participants {
        let path = dir.join(format!("{}{EXTENSION}", contact_name(address)));
        match fsutil::create_if_missing(&path, render_contact(address).as_bytes()) {
            Ok(true) => {
                tracing::debug!(path = %path.display(), "Created contact note");
                created.push(path);
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(contact = %address, error = %e, "Could not create contact note");
            }
        }
    }
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::address::EmailAddress;
    use crate::model::record::{Attachment, Recipient, RecipientKind};
    use chrono::NaiveDate;

    fn context(root: &Path) -> ProcessingContext {
        let mut config = Config::default();
        config.vault.root = root.to_path_buf();
        config.contacts.create_contact_notes = false;
        ProcessingContext::new(config)
    }

    fn record(subject: &str, topic: &str, id: &str) -> EmailRecord {
        EmailRecord {
            subject: subject.to_string(),
            conversation_topic: Some(topic.to_string()),
            received: NaiveDate::from_ymd_opt(2024, 1, 2)
                .and_then(|d| d.and_hms_opt(10, 0, 0)),
            sender: EmailAddress::new("Ann Lee", "ann@example.com"),
            recipients: vec![Recipient {
                address: EmailAddress::new("Bob Roe", "bob@example.com"),
                kind: RecipientKind::To,
            }],
            internet_message_id: Some(format!("<{id}@example.com>")),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_note_in_inbox() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        let outcome = process_email(&ctx, &record("Budget", "Budget", "m1"), &CancellationToken::new()).unwrap();

        let ProcessOutcome::Written(note) = outcome else {
            panic!("expected a written note");
        };
        assert!(!note.plan.is_grouped);
        assert_eq!(note.plan.file_name, "Budget-Ann-2024-01-02-1000.md");
        assert_eq!(note.plan.link_path, "Inbox/Budget-Ann-2024-01-02-1000");
        assert!(note.plan.path().exists());
        assert!(note.summary.is_none());
    }

    #[test]
    fn test_outgoing_mail_is_named_after_recipient() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = context(tmp.path());
        ctx.config.threads.own_addresses = vec!["ann@example.com".into()];
        let outcome = process_email(&ctx, &record("Budget", "Budget", "m1"), &CancellationToken::new()).unwrap();
        let ProcessOutcome::Written(note) = outcome else {
            panic!("expected a written note");
        };
        assert_eq!(note.plan.file_name, "Budget-Bob-2024-01-02-1000.md");
    }

    #[test]
    fn test_attachments_are_saved_and_linked() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        let mut mail = record("Report", "Report", "m1");
        mail.attachments = vec![Attachment {
            file_name: "q3.pdf".into(),
            data: b"%PDF".to_vec(),
        }];

        let ProcessOutcome::Written(note) =
            process_email(&ctx, &mail, &CancellationToken::new()).unwrap()
        else {
            panic!("expected a written note");
        };
        assert_eq!(note.attachments, vec![tmp.path().join("Inbox/attachments/q3.pdf")]);
        let content = std::fs::read_to_string(note.plan.path()).unwrap();
        assert!(content.contains("![[Inbox/attachments/q3.pdf]]"));
    }

    #[test]
    fn test_cancelled_before_start_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        let token = CancellationToken::new();
        token.cancel();
        let err = process_email(&ctx, &record("Budget", "Budget", "m1"), &token).unwrap_err();
        assert!(matches!(err, NoteError::Cancelled));
        assert!(!tmp.path().join("Inbox").exists());
    }
}

//! Note path planning: folder, file name and disambiguating suffix of a new note.
//!
//! | grouping | dates in titles | file name                                  |
//! |----------|-----------------|--------------------------------------------|
//! | single   | yes             | `{subject}-{party}-{ts}.md`                |
//! | single   | no              | `{subject}-{party}.md`                     |
//! | thread   | yes, prefix     | `{ts}-{subject}-{party}.md`                |
//! | thread   | yes, suffix     | `{subject}-{party}-{ts}.md`                |
//! | thread   | no              | `{subject}-{party}-{NNN}.md` (chronological) |
//!
//! `party` is the sender, or the first recipient for outgoing mail. The
//! thread summary `0-{thread}.md` is never part of the ordinal sequence.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use super::filename::{clean_file_name, truncate_chars};
use super::frontmatter::FrontMatter;
use crate::config::NotesConfig;
use crate::error::{NoteError, Result};
use crate::model::plan::{link_path, NotePlan};

/// Note file extension, with the dot.
pub const EXTENSION: &str = ".md";

/// Prefix of the thread summary note.
pub const SUMMARY_PREFIX: &str = "0-";

/// Front-matter `type` of the thread summary note.
pub const SUMMARY_TYPE: &str = "thread";

/// Subjects are never shortened below this many characters to fit a path.
const MIN_SUBJECT_CHARS: usize = 8;

/// The cleaned inputs of a single note.
#[derive(Debug, Clone)]
pub struct NoteRequest {
    /// Cleaned, normalized subject.
    pub subject: String,
    /// Cleaned short name of the sender.
    pub sender: String,
    /// Cleaned short name of the first recipient.
    pub recipient: String,
    pub received: NaiveDateTime,
    /// Sent by the vault owner; the recipient names the note instead.
    pub outgoing: bool,
}

impl NoteRequest {
    fn party(&self) -> &str {
        if self.outgoing && !self.recipient.is_empty() {
            &self.recipient
        } else {
            &self.sender
        }
    }
}

/// Where the note goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// Directly into the inbox.
    Single,
    /// Into a thread folder.
    Thread { folder: PathBuf, thread_name: String },
}

/// An existing note taking part in a thread's ordinal sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub path: PathBuf,
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone)]
enum Layout {
    Plain,
    DateSuffix(String),
    DatePrefix(String),
    Ordinal,
}

/// Computes [`NotePlan`]s.
#[derive(Debug, Clone, Copy)]
pub struct NotePlanner<'a> {
    config: &'a NotesConfig,
    vault_root: &'a Path,
}

impl<'a> NotePlanner<'a> {
    pub fn new(config: &'a NotesConfig, vault_root: &'a Path) -> Self {
        Self { config, vault_root }
    }

    /// Plan the location of a new note.
    ///
    /// Thread folders without dates in titles are listed to find the new
    /// note's chronological ordinal; the caller must hold the folder lock.
    /// Existing members are not renamed here (see [`super::resuffix`]).
    pub fn plan(&self, request: &NoteRequest, inbox: &Path, grouping: &Grouping) -> Result<NotePlan> {
        let stamp = self
            .config
            .include_date_in_title
            .then(|| request.received.format(&self.config.title_date_format).to_string());

        let (folder, is_grouped) = match grouping {
            Grouping::Single => (inbox.to_path_buf(), false),
            Grouping::Thread { folder, .. } => (folder.clone(), true),
        };

        let layout = match (is_grouped, stamp) {
            (false, Some(ts)) => Layout::DateSuffix(ts),
            (false, None) => Layout::Plain,
            (true, Some(ts)) if self.config.date_prefix => Layout::DatePrefix(ts),
            (true, Some(ts)) => Layout::DateSuffix(ts),
            (true, None) => Layout::Ordinal,
        };

        let party = request.party();
        let subject = self.fit_subject(&request.subject, party, &layout, &folder);

        let ordinal = match layout {
            Layout::Ordinal => {
                let base = base_name(&subject, party);
                let members = thread_members(&folder, &base)?;
                let ordinal = chronological_ordinal(&members, request.received);
                tracing::debug!(
                    folder = %folder.display(),
                    base = %base,
                    existing = members.len(),
                    ordinal,
                    "Assigned thread ordinal"
                );
                ordinal
            }
            _ => 0,
        };

        let stem = compose(&subject, party, &layout, ordinal);
        Ok(NotePlan {
            link_path: link_path(self.vault_root, &folder, &stem),
            file_name: format!("{stem}{EXTENSION}"),
            file_name_no_extension: stem,
            folder_path: folder,
            is_grouped,
        })
    }

    /// Shorten the subject so the whole path fits `max_path_length`.
    fn fit_subject(&self, subject: &str, party: &str, layout: &Layout, folder: &Path) -> String {
        let overhead = folder.to_string_lossy().chars().count()
            + 1
            + compose("", party, layout, 999).chars().count()
            + EXTENSION.len();
        let budget = self
            .config
            .max_path_length
            .saturating_sub(overhead)
            .max(MIN_SUBJECT_CHARS)
            .min(self.config.max_subject_length);
        if subject.chars().count() <= budget {
            return subject.to_string();
        }
        clean_file_name(truncate_chars(subject, budget), budget)
    }
}

fn compose(subject: &str, party: &str, layout: &Layout, ordinal: usize) -> String {
    match layout {
        Layout::Plain => base_name(subject, party),
        Layout::DateSuffix(ts) => format!("{subject}-{party}-{ts}"),
        Layout::DatePrefix(ts) => format!("{ts}-{subject}-{party}"),
        Layout::Ordinal => format!("{}{}", base_name(subject, party), ordinal_suffix(ordinal)),
    }
}

/// `{subject}-{party}`, the name shared by all ordinal-suffixed siblings.
pub fn base_name(subject: &str, party: &str) -> String {
    format!("{subject}-{party}")
}

/// `-001`, `-002`, …
pub fn ordinal_suffix(ordinal: usize) -> String {
    format!("-{ordinal:03}")
}

/// File name of a thread's summary note.
pub fn summary_file_name(thread_name: &str) -> String {
    format!("{SUMMARY_PREFIX}{thread_name}{EXTENSION}")
}

/// Whether `path` is a thread summary note.
///
/// Notes may start with `0-` too (a subject like "0-60 results"); only the
/// `type: thread` front matter written by the summary marks one.
pub fn is_summary(path: &Path) -> bool {
    let prefixed = path
        .file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with(SUMMARY_PREFIX));
    prefixed
        && matches!(FrontMatter::read(path), Ok(Some(fm)) if fm.get("type") == Some(SUMMARY_TYPE))
}

/// Split `Budget-Ann-002` into (`Budget-Ann`, `Some(2)`).
///
/// Stems without a numeric suffix are returned whole with `None`.
pub fn split_ordinal(stem: &str) -> (&str, Option<usize>) {
    if let Some((base, digits)) = stem.rsplit_once('-') {
        if !base.is_empty() && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = digits.parse() {
                return (base, Some(n));
            }
        }
    }
    (stem, None)
}

/// Notes in `folder` belonging to the ordinal sequence of `base`.
///
/// A note belongs when its stem is `base` or `base-<digits>`. Notes whose
/// `date` cannot be read are left out. Results are sorted by date.
pub fn thread_members(folder: &Path, base: &str) -> Result<Vec<Member>> {
    let mut members: Vec<Member> = note_files(folder)?
        .into_iter()
        .filter(|path| {
            path.file_stem()
                .map(|s| {
                    let stem = s.to_string_lossy();
                    stem == base || matches!(split_ordinal(&stem), (b, Some(_)) if b == base)
                })
                .unwrap_or(false)
        })
        .filter_map(|path| match note_date(&path) {
            Some(date) => Some(Member { path, date }),
            None => {
                tracing::debug!(path = %path.display(), "Skipping note without a readable date");
                None
            }
        })
        .collect();
    members.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(members)
}

/// 1-based position of `received` among `members`; ties go after existing notes.
pub fn chronological_ordinal(members: &[Member], received: NaiveDateTime) -> usize {
    members.iter().filter(|m| m.date <= received).count() + 1
}

/// Every `.md` note directly inside `folder`, excluding thread summaries.
///
/// A missing folder has no notes.
pub fn note_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(NoteError::io(folder, e)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| NoteError::io(folder, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_file() && name.ends_with(EXTENSION) && !is_summary(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The persisted `date` of a note, if readable.
pub fn note_date(path: &Path) -> Option<NaiveDateTime> {
    match FrontMatter::read(path) {
        Ok(Some(fm)) => fm.date(),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Could not read front matter");
            None
        }
    }
}

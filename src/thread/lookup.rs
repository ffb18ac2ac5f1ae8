//! Finding the notes that already belong to a conversation.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use super::identity::{normalize_subject, ConversationId};
use crate::error::{NoteError, Result};
use crate::note::filename::clean_file_name;
use crate::note::frontmatter::FrontMatter;
use crate::note::planner::note_files;

/// A note that carries a given `threadId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadNote {
    pub path: PathBuf,
    pub title: Option<String>,
    pub date: Option<NaiveDateTime>,
}

impl ThreadNote {
    /// Whether the note sits directly in `inbox` rather than in a thread folder.
    pub fn is_unthreaded(&self, inbox: &Path) -> bool {
        self.path.parent() == Some(inbox)
    }
}

/// Where a conversation lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadLocation {
    pub folder: PathBuf,
    pub thread_name: String,
    /// Prior notes, oldest first.
    pub members: Vec<ThreadNote>,
}

/// Notes in `inbox` and its direct subfolders whose `threadId` is `id`.
///
/// Sorted by date; notes without a readable date come last.
pub fn find_members(inbox: &Path, id: &ConversationId) -> Result<Vec<ThreadNote>> {
    let mut folders = vec![inbox.to_path_buf()];
    match std::fs::read_dir(inbox) {
        Ok(entries) => {
            for entry in entries {
                let entry = entry.map_err(|e| NoteError::io(inbox, e))?;
                if entry.path().is_dir() {
                    folders.push(entry.path());
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(NoteError::io(inbox, e)),
    }

    let mut members = Vec::new();
    for folder in &folders {
        for path in note_files(folder)? {
            let fm = match FrontMatter::read(&path) {
                Ok(Some(fm)) => fm,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable note");
                    continue;
                }
            };
            let matches = fm
                .get("threadId")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case(id.as_str()));
            if matches {
                members.push(ThreadNote {
                    title: fm.get("title").map(String::from),
                    date: fm.date(),
                    path,
                });
            }
        }
    }

    members.sort_by(|a, b| match (a.date, b.date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.path.cmp(&b.path),
    });
    Ok(members)
}

/// Locate the conversation `id`, if any note of it exists yet.
///
/// The thread is named after the earliest known message. A member already
/// inside a thread folder fixes the folder; otherwise it is created under
/// `inbox`. `fallback_subject` names the thread when the earliest note has
/// no title.
pub fn locate(
    inbox: &Path,
    id: &ConversationId,
    fallback_subject: &str,
    max_name_chars: usize,
) -> Result<Option<ThreadLocation>> {
    let members = find_members(inbox, id)?;
    let Some(earliest) = members.first() else {
        return Ok(None);
    };

    let title = earliest.title.as_deref().unwrap_or(fallback_subject);
    let thread_name = clean_file_name(&normalize_subject(title), max_name_chars);

    let folder = members
        .iter()
        .find(|m| !m.is_unthreaded(inbox))
        .and_then(|m| m.path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| inbox.join(&thread_name));

    let thread_name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(thread_name);

    tracing::debug!(
        thread = %id,
        folder = %folder.display(),
        members = members.len(),
        "Found existing conversation"
    );
    Ok(Some(ThreadLocation {
        folder,
        thread_name,
        members,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "00112233aabbccdd";

    fn note(path: &Path, title: &str, thread: &str, date: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            path,
            format!("---\ntitle: \"{title}\"\nthreadId: \"{thread}\"\ndate: \"{date}\"\n---\n"),
        )
        .unwrap();
    }

    #[test]
    fn test_no_members() {
        let tmp = tempfile::tempdir().unwrap();
        let id = ConversationId::parse(ID).unwrap();
        assert!(locate(tmp.path(), &id, "Budget", 80).unwrap().is_none());
        assert!(find_members(&tmp.path().join("missing"), &id).unwrap().is_empty());
    }

    #[test]
    fn test_unthreaded_member_names_new_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let inbox = tmp.path();
        note(&inbox.join("b.md"), "Re: Budget", ID, "2024-01-02 10:00:00");
        note(&inbox.join("a.md"), "Budget: Q1?", &ID.to_uppercase(), "2024-01-01 10:00:00");
        note(&inbox.join("c.md"), "Other", "ffffffffffffffff", "2024-01-01 10:00:00");

        let id = ConversationId::parse(ID).unwrap();
        let loc = locate(inbox, &id, "ignored", 80).unwrap().unwrap();
        assert_eq!(loc.members.len(), 2);
        assert_eq!(loc.members[0].path, inbox.join("a.md"));
        assert_eq!(loc.thread_name, "Budget Q1");
        assert_eq!(loc.folder, inbox.join("Budget Q1"));
    }

    #[test]
    fn test_existing_thread_folder_is_reused() {
        let tmp = tempfile::tempdir().unwrap();
        let inbox = tmp.path();
        note(&inbox.join("a.md"), "Budget", ID, "2024-01-01 10:00:00");
        note(&inbox.join("Budget plans").join("b.md"), "Re: Budget", ID, "2024-01-02 10:00:00");
        std::fs::write(inbox.join("Budget plans").join("0-Budget plans.md"), "---\nthreadId: \"00112233aabbccdd\"\ntype: \"thread\"\n---\n").unwrap();

        let id = ConversationId::parse(ID).unwrap();
        let loc = locate(inbox, &id, "ignored", 80).unwrap().unwrap();
        assert_eq!(loc.folder, inbox.join("Budget plans"));
        assert_eq!(loc.thread_name, "Budget plans");
        assert_eq!(loc.members.len(), 2);
        assert!(loc.members[0].is_unthreaded(inbox));
    }
}

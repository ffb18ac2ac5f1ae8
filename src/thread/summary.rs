//! The `0-{thread}.md` note listing every message of a conversation.

use std::path::{Path, PathBuf};

use super::identity::ConversationId;
use crate::error::Result;
use crate::fsutil;
use crate::model::plan::link_path;
use crate::note::frontmatter::{FrontMatterBuilder, DATE_FORMAT};
use crate::note::planner::{note_date, note_files, summary_file_name, SUMMARY_TYPE};

/// (Re)write the summary note of the thread in `folder`.
///
/// Members are listed oldest first. The caller must hold the folder lock.
pub fn write_summary(
    folder: &Path,
    thread_name: &str,
    id: &ConversationId,
    vault_root: &Path,
) -> Result<PathBuf> {
    let mut members: Vec<_> = note_files(folder)?
        .into_iter()
        .map(|path| (note_date(&path), path))
        .collect();
    // Undated notes last, then by name.
    members.sort_by(|(da, pa), (db, pb)| {
        da.is_none().cmp(&db.is_none()).then(da.cmp(db)).then(pa.cmp(pb))
    });

    let mut content = FrontMatterBuilder::new()
        .field("title", thread_name)
        .field("threadId", id.as_str())
        .field("type", SUMMARY_TYPE)
        .field("messages", &members.len().to_string())
        .list("tags", ["email-thread"])
        .build();

    content.push_str(&format!("\n# {thread_name}\n\n"));
    for (date, path) in &members {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let link = link_path(vault_root, folder, &stem);
        match date {
            Some(d) => content.push_str(&format!("- [[{link}|{stem}]] ({})\n", d.format(DATE_FORMAT))),
            None => content.push_str(&format!("- [[{link}|{stem}]]\n")),
        }
    }

    let path = folder.join(summary_file_name(thread_name));
    fsutil::write_file(&path, content.as_bytes())?;
    tracing::debug!(path = %path.display(), messages = members.len(), "Wrote thread summary");
    Ok(path)
}

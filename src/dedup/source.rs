//! Where the duplicate cache gets its ids from.

use std::path::{Path, PathBuf};

use crate::error::{NoteError, Result};
use crate::note::frontmatter::FrontMatter;

/// Front-matter fields holding message identifiers.
pub const ID_FIELDS: [&str; 2] = ["internetMessageId", "entryId"];

/// Produces every message id already present in the vault.
pub trait IdSource: Send + Sync {
    fn collect_ids(&self) -> Result<Vec<String>>;
}

/// Scans every note below a directory, reading only front matter.
#[derive(Debug, Clone)]
pub struct VaultIdSource {
    root: PathBuf,
}

impl VaultIdSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl IdSource for VaultIdSource {
    fn collect_ids(&self) -> Result<Vec<String>> {
        let mut notes = Vec::new();
        collect_notes(&self.root, &mut notes)?;

        let mut ids = Vec::new();
        for path in &notes {
            match FrontMatter::read(path) {
                Ok(Some(fm)) => {
                    ids.extend(ID_FIELDS.iter().filter_map(|f| fm.get(f)).map(String::from));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable note");
                }
            }
        }
        tracing::debug!(
            root = %self.root.display(),
            notes = notes.len(),
            ids = ids.len(),
            "Scanned vault for message ids"
        );
        Ok(ids)
    }
}

/// Every `.md` file below `dir`, recursively. A missing `dir` is empty.
fn collect_notes(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(NoteError::io(dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| NoteError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_notes(&path, out)?;
        } else if path.extension().is_some_and(|e| e == "md") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_ids_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let inbox = tmp.path();
        std::fs::write(
            inbox.join("a.md"),
            "---\ninternetMessageId: \"<a@x>\"\nentryId: \"00AA\"\n---\n",
        )
        .unwrap();
        std::fs::create_dir_all(inbox.join("Thread")).unwrap();
        std::fs::write(inbox.join("Thread").join("b.md"), "---\ninternetMessageId: \"<b@x>\"\n---\n").unwrap();
        std::fs::write(inbox.join("Thread").join("c.md"), "no front matter").unwrap();
        std::fs::write(inbox.join("d.txt"), "---\ninternetMessageId: \"<d@x>\"\n---\n").unwrap();

        let mut ids = VaultIdSource::new(inbox).collect_ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["00AA", "<a@x>", "<b@x>"]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let source = VaultIdSource::new(tmp.path().join("nope"));
        assert!(source.collect_ids().unwrap().is_empty());
    }
}

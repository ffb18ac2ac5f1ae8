//! Where a note will be written.

use std::path::{Path, PathBuf};

/// The computed location of a new note.
///
/// Built fresh for every message and never persisted; only the file it
/// describes is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePlan {
    /// Directory the note goes into (the inbox or a thread folder).
    pub folder_path: PathBuf,
    /// File name including the `.md` extension.
    pub file_name: String,
    /// File name without extension, used as the note title in links.
    pub file_name_no_extension: String,
    /// Whether the note lives in a thread folder.
    pub is_grouped: bool,
    /// Vault-relative path without extension, `/`-separated, for `[[links]]`.
    pub link_path: String,
}

impl NotePlan {
    /// Full path of the note.
    pub fn path(&self) -> PathBuf {
        self.folder_path.join(&self.file_name)
    }

    /// Re-point the plan at a different file name in the same folder.
    ///
    /// Used when the writer had to pick another name to avoid overwriting.
    pub fn renamed(&self, actual: &Path, vault_root: &Path) -> Self {
        let file_name = actual
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_name.clone());
        let stem = file_name
            .strip_suffix(".md")
            .unwrap_or(&file_name)
            .to_string();
        Self {
            folder_path: self.folder_path.clone(),
            link_path: link_path(vault_root, &self.folder_path, &stem),
            file_name,
            file_name_no_extension: stem,
            is_grouped: self.is_grouped,
        }
    }
}

/// Vault-relative, `/`-separated path of `folder/stem`.
///
/// Falls back to the bare stem when `folder` is outside the vault.
pub fn link_path(vault_root: &Path, folder: &Path, stem: &str) -> String {
    let relative = folder.strip_prefix(vault_root).unwrap_or(Path::new(""));
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|c| !c.is_empty() && c != ".")
        .collect();
    parts.push(stem.to_string());
    parts.join("/")
}

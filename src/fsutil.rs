//! File operations shared by note, attachment and thread writers.
//!
//! Nothing here overwrites an existing file: new files are created with
//! `create_new`, and a taken name is disambiguated with a counter.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::error::{NoteError, Result};

/// Attempts made by [`wait_for_file`].
pub const WAIT_ATTEMPTS: u32 = 5;

/// First delay of [`wait_for_file`]; doubles after each attempt.
pub const WAIT_INITIAL_DELAY: Duration = Duration::from_millis(50);

/// Names tried by [`write_new_file`] before giving up.
pub const WRITE_ATTEMPTS: usize = 10;

/// Wait until `path` can be opened for reading and writing.
///
/// Sync clients and indexers briefly lock files they just saw change.
/// Returns `false` if the file is still unavailable after the last attempt.
pub fn wait_for_file(path: &Path) -> bool {
    let mut delay = WAIT_INITIAL_DELAY;
    for attempt in 1..=WAIT_ATTEMPTS {
        match OpenOptions::new().read(true).write(true).open(path) {
            Ok(_) => return true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return false,
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    attempt,
                    error = %e,
                    "File busy, backing off"
                );
                if attempt < WAIT_ATTEMPTS {
                    thread::sleep(delay);
                    delay *= 2;
                }
            }
        }
    }
    false
}

/// `{stem} (n).{ext}` next to `path`.
fn numbered(path: &Path, n: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("note");
    let parent = path.parent().unwrap_or(Path::new("."));
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => parent.join(format!("{stem} ({n}).{ext}")),
        None => parent.join(format!("{stem} ({n})")),
    }
}

/// Create `path` with `contents`, never overwriting.
///
/// When the name is taken (including by a file created between planning and
/// writing), `{stem} (1).md`, `{stem} (2).md`, … are tried. Returns the path
/// actually written.
pub fn write_new_file(path: &Path, contents: &[u8]) -> Result<PathBuf> {
    for attempt in 0..WRITE_ATTEMPTS {
        let candidate = if attempt == 0 {
            path.to_path_buf()
        } else {
            numbered(path, attempt)
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                file.write_all(contents)
                    .map_err(|e| NoteError::io(&candidate, e))?;
                file.flush().map_err(|e| NoteError::io(&candidate, e))?;
                if attempt > 0 {
                    tracing::info!(
                        planned = %path.display(),
                        written = %candidate.display(),
                        "Planned name was taken, wrote under a numbered name"
                    );
                }
                return Ok(candidate);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(NoteError::io(&candidate, e)),
        }
    }
    Err(NoteError::WriteConflict {
        path: path.to_path_buf(),
        attempts: WRITE_ATTEMPTS,
    })
}

/// Replace the contents of `path`, creating it if needed.
///
/// Only used for files this crate owns outright (thread summaries).
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() && !wait_for_file(path) {
        tracing::warn!(path = %path.display(), "File still busy, writing anyway");
    }
    std::fs::write(path, contents).map_err(|e| NoteError::io(path, e))
}

/// Create `path` with `contents` unless it already exists.
///
/// Returns whether the file was created.
pub fn create_if_missing(path: &Path, contents: &[u8]) -> Result<bool> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(contents).map_err(|e| NoteError::io(path, e))?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(NoteError::io(path, e)),
    }
}

/// If `path` already exists, append a counter to make it unique.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    parent.join(format!("{stem}_dup.{ext}"))
}

/// Rename `from` to `to` after waiting for `from` to be released.
pub fn rename(from: &Path, to: &Path) -> Result<()> {
    if !wait_for_file(from) {
        tracing::warn!(path = %from.display(), "File still busy, renaming anyway");
    }
    std::fs::rename(from, to).map_err(|e| NoteError::io(from, e))
}

/// Move `path` into `folder`, keeping its name unless taken.
///
/// Returns the new path.
pub fn move_into(path: &Path, folder: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| NoteError::InvalidPath(path.display().to_string()))?;
    std::fs::create_dir_all(folder).map_err(|e| NoteError::io(folder, e))?;

    let mut target = folder.join(name);
    let mut n = 1;
    while target.exists() {
        if n > WRITE_ATTEMPTS {
            return Err(NoteError::WriteConflict {
                path: folder.join(name),
                attempts: WRITE_ATTEMPTS,
            });
        }
        target = numbered(&folder.join(name), n);
        n += 1;
    }
    rename(path, &target)?;
    Ok(target)
}

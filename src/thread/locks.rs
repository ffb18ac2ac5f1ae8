//! Per-folder mutual exclusion for thread folders.
//!
//! Listing members, renaming them, writing the new note, its attachments and
//! the thread summary must happen as one unit per folder. Two messages of the
//! same conversation processed at once would otherwise compute the same
//! ordinal suffixes.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Lazily created, never evicted locks keyed by folder path.
///
/// Keys are compared case-insensitively, matching Windows and macOS file
/// systems where `Inbox/Budget` and `inbox/budget` are the same folder.
#[derive(Debug, Default)]
pub struct FolderLockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FolderLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock of `folder`.
    pub fn with_folder<R>(&self, folder: &Path, f: impl FnOnce() -> R) -> R {
        let lock = self.lock_for(folder);
        let _guard = lock.lock();
        tracing::trace!(folder = %folder.display(), "Acquired thread folder lock");
        f()
    }

    /// Number of folders that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn lock_for(&self, folder: &Path) -> Arc<Mutex<()>> {
        let key = folder.to_string_lossy().to_lowercase();
        // Clone the Arc so the map shard is released before blocking on the mutex.
        self.locks.entry(key).or_default().clone()
    }
}

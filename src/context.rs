//! State shared by every message processed in one host session.

use crate::config::Config;
use crate::dedup::{EmailIdCache, IdSource, VaultIdSource};
use crate::thread::locks::FolderLockRegistry;

/// Configuration plus the process-lifetime caches and locks.
///
/// Wrap it in an `Arc` and hand a clone to each concurrent invocation of
/// [`crate::process::process_email`].
#[derive(Debug)]
pub struct ProcessingContext {
    pub config: Config,
    pub id_cache: EmailIdCache,
    pub folder_locks: FolderLockRegistry,
}

impl ProcessingContext {
    /// Context whose duplicate cache scans the configured inbox.
    pub fn new(config: Config) -> Self {
        let source = VaultIdSource::new(config.vault.inbox_dir());
        Self::with_id_source(config, source)
    }

    /// Context with a custom id source for the duplicate cache.
    pub fn with_id_source(config: Config, source: impl IdSource + 'static) -> Self {
        let id_cache = EmailIdCache::new(source, config.dedup.freshness());
        Self {
            config,
            id_cache,
            folder_locks: FolderLockRegistry::new(),
        }
    }
}

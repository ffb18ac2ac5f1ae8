//! In-memory set of message ids already written to the vault.
//!
//! Built from a full scan on first use and whenever it is older than the
//! freshness window, then kept current by [`EmailIdCache::record_processed`].
//! Lookups and inserts go through a concurrent map; only rebuilds take the
//! build lock, and a caller that waited on it re-checks freshness so that
//! concurrent first lookups cause a single scan.
//!
//! A rebuild only adds ids: ids recorded while a scan runs are kept, and
//! notes deleted from the vault stay in the set for the life of the process.
//! Duplicates created outside this crate are seen after the next rebuild.

use std::time::{Duration, Instant};

use dashmap::DashSet;
use parking_lot::{Mutex, RwLock};

use super::source::IdSource;
use crate::error::Result;

/// Case-insensitive, concurrently readable set of message ids.
pub struct EmailIdCache {
    ids: DashSet<String>,
    built_at: RwLock<Option<Instant>>,
    build_lock: Mutex<()>,
    freshness: Duration,
    source: Box<dyn IdSource>,
}

impl std::fmt::Debug for EmailIdCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailIdCache")
            .field("ids", &self.ids.len())
            .field("built_at", &*self.built_at.read())
            .field("freshness", &self.freshness)
            .finish()
    }
}

fn key(id: &str) -> Option<String> {
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_lowercase())
}

impl EmailIdCache {
    pub fn new(source: impl IdSource + 'static, freshness: Duration) -> Self {
        Self {
            ids: DashSet::new(),
            built_at: RwLock::new(None),
            build_lock: Mutex::new(()),
            freshness,
            source: Box::new(source),
        }
    }

    /// Whether either id has been seen. Empty ids never match.
    pub fn is_duplicate(&self, internet_message_id: &str, entry_id: &str) -> Result<bool> {
        self.ensure_fresh()?;
        Ok([internet_message_id, entry_id]
            .into_iter()
            .filter_map(key)
            .any(|k| self.ids.contains(&k)))
    }

    /// Remember the ids of a note that was just written.
    pub fn record_processed(&self, internet_message_id: &str, entry_id: &str) {
        for k in [internet_message_id, entry_id].into_iter().filter_map(key) {
            self.ids.insert(k);
        }
    }

    /// Force the next lookup to rescan.
    pub fn invalidate(&self) {
        *self.built_at.write() = None;
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn is_stale(&self) -> bool {
        match *self.built_at.read() {
            Some(at) => at.elapsed() >= self.freshness,
            None => true,
        }
    }

    fn ensure_fresh(&self) -> Result<()> {
        if !self.is_stale() {
            return Ok(());
        }
        let _guard = self.build_lock.lock();
        if !self.is_stale() {
            return Ok(());
        }

        let started = Instant::now();
        let scanned = self.source.collect_ids()?;
        for k in scanned.iter().filter_map(|id| key(id)) {
            self.ids.insert(k);
        }
        *self.built_at.write() = Some(Instant::now());
        tracing::info!(
            ids = self.ids.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rebuilt duplicate id cache"
        );
        Ok(())
    }
}

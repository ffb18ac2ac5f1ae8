//! Duplicate detection: skip messages that already have a note.

pub mod cache;
pub mod source;

pub use cache::EmailIdCache;
pub use source::{IdSource, VaultIdSource};

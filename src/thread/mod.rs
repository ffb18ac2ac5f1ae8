//! Conversation threads: identity, lookup, folder locking and summaries.

pub mod identity;
pub mod locks;
pub mod lookup;
pub mod summary;

//! `mailnotes` — file email messages as Markdown notes in an Obsidian vault.
//!
//! Messages of one conversation are grouped into a thread folder with a
//! summary note, note names are planned so that nothing is overwritten, and
//! messages already in the vault are skipped.

pub mod cancel;
pub mod config;
pub mod context;
pub mod dedup;
pub mod error;
pub mod fsutil;
pub mod logging;
pub mod model;
pub mod note;
pub mod process;
pub mod source;
pub mod thread;

//! Concrete mail record sources.

pub mod eml;

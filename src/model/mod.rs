//! Core data model types: messages, addresses, and note plans.

pub mod address;
pub mod plan;
pub mod record;

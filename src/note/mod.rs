//! Markdown notes: file names, front matter, path planning and renumbering.

pub mod filename;
pub mod frontmatter;
pub mod planner;
pub mod render;
pub mod resuffix;

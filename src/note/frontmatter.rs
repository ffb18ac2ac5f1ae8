//! Front matter: the `---` delimited metadata block at the top of a note.
//!
//! ```text
//! ---
//! title: "Budget review"
//! threadId: "3f2a9c0d41b7e855"
//! date: "2024-01-02 09:30:00"
//! to:
//!   - "[[Bob]]"
//! ---
//! ```
//!
//! Parsing is lenient: a missing block yields `None`, malformed lines are
//! ignored, and a field that cannot be interpreted is "unknown".

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{NoteError, Result};

/// Opening and closing marker line.
pub const DELIMITER: &str = "---";

/// Format of the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single front-matter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

/// Parsed front matter, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    fields: Vec<(String, Value)>,
}

impl FrontMatter {
    /// Read the front matter of a note file, stopping at the closing marker.
    ///
    /// Returns `Ok(None)` when the file does not start with a front-matter block.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let file = File::open(path).map_err(|e| NoteError::io(path, e))?;
        let reader = BufReader::new(file);
        let mut lines = Vec::new();
        let mut opened = false;

        for line in reader.lines() {
            let line = line.map_err(|e| NoteError::io(path, e))?;
            let marker = line.trim_end() == DELIMITER;
            if !opened {
                // Tolerate a UTF-8 byte order mark written by some editors.
                if line.trim_start_matches('\u{feff}').trim_end() != DELIMITER {
                    return Ok(None);
                }
                opened = true;
                continue;
            }
            if marker {
                return Ok(Some(Self::from_lines(lines.iter().map(String::as_str))));
            }
            lines.push(line);
        }
        // Unterminated block.
        Ok(None)
    }

    /// Parse the front matter at the start of `text`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines();
        if lines.next()?.trim_start_matches('\u{feff}').trim_end() != DELIMITER {
            return None;
        }
        let mut body = Vec::new();
        for line in lines {
            if line.trim_end() == DELIMITER {
                return Some(Self::from_lines(body.into_iter()));
            }
            body.push(line);
        }
        None
    }

    fn from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Self {
        let mut fields: Vec<(String, Value)> = Vec::new();
        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some(item) = trimmed.strip_prefix("- ") {
                if line.starts_with(char::is_whitespace) || line.starts_with('-') {
                    if let Some((_, Value::List(items))) = fields.last_mut() {
                        items.push(unquote(item));
                    }
                }
                continue;
            }
            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let key = key.trim().to_string();
            let value = value.trim();
            if value.is_empty() {
                fields.push((key, Value::List(Vec::new())));
            } else {
                fields.push((key, Value::Scalar(unquote(value))));
            }
        }
        Self { fields }
    }

    /// First scalar value for `key`, quotes removed. Empty values are `None`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.iter().find_map(|(k, v)| match v {
            Value::Scalar(s) if k == key && !s.is_empty() => Some(s.as_str()),
            _ => None,
        })
    }

    /// List items for `key` (empty if absent or scalar).
    pub fn list(&self, key: &str) -> &[String] {
        self.fields
            .iter()
            .find_map(|(k, v)| match v {
                Value::List(items) if k == key => Some(items.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// The `date` field, if present and well-formed.
    pub fn date(&self) -> Option<NaiveDateTime> {
        self.get("date")
            .and_then(|d| NaiveDateTime::parse_from_str(d.trim(), DATE_FORMAT).ok())
    }
}

/// Strip one pair of surrounding quotes and undo `\"` / `\\` escapes.
fn unquote(value: &str) -> String {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            let inner = &value[1..value.len() - 1];
            return if quote == '"' {
                inner.replace("\\\"", "\"").replace("\\\\", "\\")
            } else {
                inner.to_string()
            };
        }
    }
    value.to_string()
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Renders a front-matter block.
#[derive(Debug, Default)]
pub struct FrontMatterBuilder {
    out: String,
}

impl FrontMatterBuilder {
    pub fn new() -> Self {
        Self {
            out: format!("{DELIMITER}\n"),
        }
    }

    /// Add `key: "value"`.
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.out.push_str(&format!("{key}: {}\n", quote(value)));
        self
    }

    /// Add `key: "value"` when `value` is present.
    pub fn optional(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.field(key, v),
            _ => self,
        }
    }

    /// Add `date: "yyyy-MM-dd HH:mm:ss"`.
    pub fn date(self, date: NaiveDateTime) -> Self {
        let formatted = date.format(DATE_FORMAT).to_string();
        self.field("date", &formatted)
    }

    /// Add `key:` followed by indented list items. Skipped when empty.
    pub fn list<I, S>(mut self, key: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items: Vec<String> = items
            .into_iter()
            .map(|i| format!("  - {}\n", quote(i.as_ref())))
            .collect();
        if !items.is_empty() {
            self.out.push_str(&format!("{key}:\n"));
            for item in items {
                self.out.push_str(&item);
            }
        }
        self
    }

    /// Close the block and return it.
    pub fn build(mut self) -> String {
        self.out.push_str(DELIMITER);
        self.out.push('\n');
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const NOTE: &str = "---\ntitle: \"Budget review\"\nthreadId: \"3f2a9c0d41b7e855\"\ndate: \"2024-01-02 09:30:00\"\nto:\n  - \"[[Bob]]\"\n  - \"[[Carol]]\"\ninternetMessageId: <abc@example.com>\n---\n# Budget review\n";

    #[test]
    fn test_parse_fields() {
        let fm = FrontMatter::parse(NOTE).unwrap();
        assert_eq!(fm.get("title"), Some("Budget review"));
        assert_eq!(fm.get("threadId"), Some("3f2a9c0d41b7e855"));
        assert_eq!(fm.get("internetMessageId"), Some("<abc@example.com>"));
        assert_eq!(fm.list("to"), &["[[Bob]]".to_string(), "[[Carol]]".to_string()]);
        assert_eq!(
            fm.date(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(9, 30, 0)
        );
    }

    #[test]
    fn test_missing_block() {
        assert!(FrontMatter::parse("# Just a heading\n").is_none());
        assert!(FrontMatter::parse("---\ntitle: \"never closed\"\n").is_none());
        assert!(FrontMatter::parse("").is_none());
    }

    #[test]
    fn test_malformed_date_is_unknown() {
        let fm = FrontMatter::parse("---\ndate: \"yesterday\"\n---\n").unwrap();
        assert_eq!(fm.get("date"), Some("yesterday"));
        assert!(fm.date().is_none());
    }

    #[test]
    fn test_first_date_field_wins() {
        let fm = FrontMatter::parse("---\ndate: 2024-01-01 08:00:00\ndate: 2025-01-01 08:00:00\n---\n")
            .unwrap();
        assert_eq!(fm.date().unwrap().format("%Y").to_string(), "2024");
    }

    #[test]
    fn test_builder_output_parses_back() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 0, 7)
            .unwrap();
        let text = FrontMatterBuilder::new()
            .field("title", "He said \"hi\"")
            .date(date)
            .optional("entryId", None)
            .list("tags", ["email"])
            .list("cc", Vec::<String>::new())
            .build();
        assert!(text.contains("date: \"2024-03-05 14:00:07\"\n"));
        assert!(!text.contains("entryId"));
        assert!(!text.contains("cc:"));

        let fm = FrontMatter::parse(&text).unwrap();
        assert_eq!(fm.get("title"), Some("He said \"hi\""));
        assert_eq!(fm.date(), Some(date));
        assert_eq!(fm.list("tags"), &["email".to_string()]);
    }

    #[test]
    fn test_read_stops_at_closing_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("note.md");
        std::fs::write(&path, format!("{NOTE}\n---\ntitle: \"not front matter\"\n---\n")).unwrap();
        let fm = FrontMatter::read(&path).unwrap().unwrap();
        assert_eq!(fm.get("title"), Some("Budget review"));

        let plain = tmp.path().join("plain.md");
        std::fs::write(&plain, "no header\n").unwrap();
        assert!(FrontMatter::read(&plain).unwrap().is_none());
    }
}

//! File-name cleaning for note titles and participant names.

use crate::model::address::EmailAddress;

/// Characters rejected by Windows, macOS or Obsidian link syntax.
const INVALID: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']'];

/// Make `s` safe to use as (part of) a file name.
///
/// Invalid characters become spaces, whitespace runs collapse, trailing dots
/// and spaces are removed, and the result is cut to `max_chars` characters.
/// An empty result becomes `"untitled"`.
pub fn clean_file_name(s: &str, max_chars: usize) -> String {
    let replaced: String = s
        .chars()
        .map(|c| {
            if c.is_control() || INVALID.contains(&c) {
                ' '
            } else {
                c
            }
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated = truncate_chars(&collapsed, max_chars);
    let cleaned = truncated.trim_end_matches(['.', ' ']).trim_start();

    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

/// The first `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Short form of a person's name used in note file names.
///
/// First word of the display name, else the local part of the address.
/// `"Last, First"` display names yield `First`.
pub fn short_name(address: &EmailAddress) -> String {
    let display = address.display_name.trim();
    let candidate = if let Some((_, first)) = display.split_once(',') {
        first.split_whitespace().next()
    } else {
        display.split_whitespace().next()
    };
    let raw = match candidate {
        Some(word) => word,
        None if !address.local_part().is_empty() => address.local_part(),
        None => "unknown",
    };
    clean_file_name(raw, 40)
}

/// Full name used for contact notes and `[[links]]`.
pub fn contact_name(address: &EmailAddress) -> String {
    let name = address.name();
    if name.trim().is_empty() {
        "unknown".to_string()
    } else {
        clean_file_name(name, 80)
    }
}

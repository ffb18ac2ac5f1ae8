//! Renumbering of ordinal suffixes inside a thread folder.
//!
//! Inserting a message in the middle of a conversation shifts the ordinal of
//! every later note. This pass renames members so that `-001`, `-002`, …
//! follow their persisted dates again, optionally keeping one ordinal free for
//! a note about to be written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use super::planner::{
    chronological_ordinal, note_date, note_files, ordinal_suffix, split_ordinal, Member, EXTENSION,
};
use crate::error::Result;
use crate::fsutil;

/// Suffix of the temporary names used while shifting.
const TEMP_SUFFIX: &str = ".resuffix-tmp";

/// An ordinal kept free for a note that is not written yet.
#[derive(Debug, Clone, Copy)]
pub struct Reservation<'a> {
    pub base: &'a str,
    pub received: NaiveDateTime,
}

/// Renumber every ordinal sequence in `folder`.
///
/// Notes whose date cannot be read keep their name. Returns the number of
/// notes renamed. The caller must hold the folder lock.
pub fn resuffix(folder: &Path, reserved: Option<Reservation<'_>>) -> Result<usize> {
    let mut groups: BTreeMap<String, Vec<(Member, Option<usize>)>> = BTreeMap::new();
    for path in note_files(folder)? {
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let Some(date) = note_date(&path) else {
            continue;
        };
        let (base, ordinal) = split_ordinal(&stem);
        groups
            .entry(base.to_string())
            .or_default()
            .push((Member { path, date }, ordinal));
    }

    let mut moves: Vec<(PathBuf, PathBuf)> = Vec::new();
    for (base, mut members) in groups {
        // Equal dates keep their current relative order.
        members.sort_by(|(a, an), (b, bn)| a.date.cmp(&b.date).then(an.cmp(bn)));

        let skip = reserved.filter(|r| r.base == base).map(|r| {
            let dated: Vec<Member> = members.iter().map(|(m, _)| m.clone()).collect();
            chronological_ordinal(&dated, r.received)
        });

        let mut ordinal = 0;
        for (member, _) in members {
            ordinal += 1;
            if Some(ordinal) == skip {
                ordinal += 1;
            }
            let target = folder.join(format!("{base}{}{EXTENSION}", ordinal_suffix(ordinal)));
            if target != member.path {
                moves.push((member.path, target));
            }
        }
    }

    if moves.is_empty() {
        return Ok(0);
    }

    // Two phases so that shifting 002 → 003 never lands on a live 003.
    let mut staged = Vec::with_capacity(moves.len());
    for (from, to) in moves {
        let mut temp = from.clone().into_os_string();
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);
        fsutil::rename(&from, &temp)?;
        staged.push((temp, to));
    }

    let count = staged.len();
    for (temp, to) in staged {
        let target = if to.exists() {
            // Occupied by a note outside the sequence (e.g. an unreadable date).
            fsutil::unique_path(&to)
        } else {
            to
        };
        fsutil::rename(&temp, &target)?;
        tracing::debug!(to = %target.display(), "Renumbered thread note");
    }

    tracing::info!(folder = %folder.display(), renamed = count, "Resuffixed thread folder");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    fn write(folder: &Path, name: &str, date: &str) {
        std::fs::write(
            folder.join(name),
            format!("---\ndate: \"{date}\"\nmarker: \"{name}\"\n---\n"),
        )
        .unwrap();
    }

    fn marker(path: &Path) -> String {
        let fm = crate::note::frontmatter::FrontMatter::read(path).unwrap().unwrap();
        fm.get("marker").unwrap().to_string()
    }

    #[test]
    fn test_reserves_midpoint_slot() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path();
        write(folder, "Topic-Ann-001.md", "2024-01-01 10:00:00");
        write(folder, "Topic-Ann-002.md", "2024-01-03 10:00:00");

        let renamed = resuffix(
            folder,
            Some(Reservation {
                base: "Topic-Ann",
                received: at(2),
            }),
        )
        .unwrap();

        assert_eq!(renamed, 1);
        assert!(folder.join("Topic-Ann-001.md").exists());
        assert!(!folder.join("Topic-Ann-002.md").exists());
        assert_eq!(marker(&folder.join("Topic-Ann-003.md")), "Topic-Ann-002.md");
    }

    #[test]
    fn test_restores_chronological_order() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path();
        write(folder, "Topic-Ann-001.md", "2024-01-05 10:00:00");
        write(folder, "Topic-Ann-002.md", "2024-01-01 10:00:00");
        write(folder, "Topic-Ann.md", "2024-01-03 10:00:00");
        std::fs::write(
            folder.join("0-Topic.md"),
            "---\ntype: \"thread\"\ndate: \"2024-01-01 10:00:00\"\n---\n",
        )
        .unwrap();

        assert_eq!(resuffix(folder, None).unwrap(), 3);
        assert_eq!(marker(&folder.join("Topic-Ann-001.md")), "Topic-Ann-002.md");
        assert_eq!(marker(&folder.join("Topic-Ann-002.md")), "Topic-Ann.md");
        assert_eq!(marker(&folder.join("Topic-Ann-003.md")), "Topic-Ann-001.md");
        assert!(folder.join("0-Topic.md").exists());
    }

    #[test]
    fn test_groups_are_independent_and_undated_notes_stay() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path();
        write(folder, "Topic-Ann.md", "2024-01-01 10:00:00");
        write(folder, "Topic-Bob.md", "2024-01-02 10:00:00");
        std::fs::write(folder.join("Topic-Ann-009.md"), "no front matter").unwrap();

        assert_eq!(resuffix(folder, None).unwrap(), 2);
        assert!(folder.join("Topic-Ann-001.md").exists());
        assert!(folder.join("Topic-Bob-001.md").exists());
        assert!(folder.join("Topic-Ann-009.md").exists());
    }

    #[test]
    fn test_nothing_to_do() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "Topic-Ann-001.md", "2024-01-01 10:00:00");
        assert_eq!(resuffix(tmp.path(), None).unwrap(), 0);
        assert_eq!(resuffix(&tmp.path().join("missing"), None).unwrap(), 0);
    }
}

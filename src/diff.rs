//! Line oriented comparison of two texts.
//!
//! The default [`DiffStrategy::Membership`] judges every line only by whether
//! an identical line exists anywhere on the other side. It never aligns the
//! two texts, so moved or duplicated lines are not reported as changes.
//! [`DiffStrategy::Myers`] computes a minimal edit script instead.

use std::{
    collections::{BTreeSet, HashSet},
    fmt::Display,
    str::FromStr,
};

use diffy::Line;
use serde::{Deserialize, Serialize};

/// One reported line, numbered from 1 within the text it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub line_num: usize,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub lines_added: usize,
    pub lines_deleted: usize,
    pub lines_unchanged: usize,
}

/// The result of comparing an old text with a new one.
///
/// Additions and unchanged lines are numbered by their position in the new
/// text, deletions by their position in the old text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub additions: Vec<DiffLine>,
    pub deletions: Vec<DiffLine>,
    pub unchanged: Vec<DiffLine>,
    pub stats: DiffStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStrategy {
    #[default]
    Membership,
    Myers,
}

impl Display for DiffStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffStrategy::Membership => write!(f, "membership"),
            DiffStrategy::Myers => write!(f, "myers"),
        }
    }
}

impl FromStr for DiffStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "membership" => Ok(DiffStrategy::Membership),
            "myers" => Ok(DiffStrategy::Myers),
            other => Err(format!(
                "unknown diff strategy {:?}, expected membership or myers",
                other
            )),
        }
    }
}

/// Splits on `\n`. The empty text has no lines at all, while `"a\n"` has two.
fn lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

fn numbered<'a>(
    lines: &'a [&'a str],
    mut keep: impl FnMut(usize, &str) -> bool + 'a,
) -> impl Iterator<Item = DiffLine> + 'a {
    lines
        .iter()
        .enumerate()
        .filter(move |(i, line)| keep(i + 1, line))
        .map(|(i, line)| DiffLine {
            line_num: i + 1,
            content: (*line).to_owned(),
        })
}

impl Diff {
    fn from_parts(additions: Vec<DiffLine>, deletions: Vec<DiffLine>, unchanged: Vec<DiffLine>) -> Self {
        let stats = DiffStats {
            lines_added: additions.len(),
            lines_deleted: deletions.len(),
            lines_unchanged: unchanged.len(),
        };
        Diff {
            additions,
            deletions,
            unchanged,
            stats,
        }
    }
}

/// Compares two texts with the membership strategy.
pub fn diff(old_text: &str, new_text: &str) -> Diff {
    diff_with(old_text, new_text, DiffStrategy::Membership)
}

pub fn diff_with(old_text: &str, new_text: &str, strategy: DiffStrategy) -> Diff {
    let old = lines(old_text);
    let new = lines(new_text);
    match strategy {
        DiffStrategy::Membership => membership(&old, &new),
        DiffStrategy::Myers => myers(&old, &new),
    }
}

fn membership(old: &[&str], new: &[&str]) -> Diff {
    let old_set: HashSet<&str> = old.iter().copied().collect();
    let new_set: HashSet<&str> = new.iter().copied().collect();

    let additions = numbered(new, |_, line| !old_set.contains(line)).collect();
    let deletions = numbered(old, |_, line| !new_set.contains(line)).collect();
    let unchanged = numbered(new, |_, line| old_set.contains(line)).collect();
    Diff::from_parts(additions, deletions, unchanged)
}

fn myers(old: &[&str], new: &[&str]) -> Diff {
    let mut deleted: BTreeSet<usize> = BTreeSet::new();
    let mut added: BTreeSet<usize> = BTreeSet::new();

    if old.is_empty() {
        added.extend(1..=new.len());
    } else if new.is_empty() {
        deleted.extend(1..=old.len());
    } else {
        // Every line gets its own terminator so diffy sees exactly our lines.
        let old_text: String = old.iter().map(|line| format!("{}\n", line)).collect();
        let new_text: String = new.iter().map(|line| format!("{}\n", line)).collect();
        let patch = diffy::create_patch(&old_text, &new_text);
        for hunk in patch.hunks() {
            let mut old_num = hunk.old_range().start();
            let mut new_num = hunk.new_range().start();
            for line in hunk.lines() {
                match line {
                    Line::Context(_) => {
                        old_num += 1;
                        new_num += 1;
                    }
                    Line::Delete(_) => {
                        deleted.insert(old_num);
                        old_num += 1;
                    }
                    Line::Insert(_) => {
                        added.insert(new_num);
                        new_num += 1;
                    }
                }
            }
        }
    }

    let additions = numbered(new, |n, _| added.contains(&n)).collect();
    let deletions = numbered(old, |n, _| deleted.contains(&n)).collect();
    let unchanged = numbered(new, |n, _| !added.contains(&n)).collect();
    Diff::from_parts(additions, deletions, unchanged)
}

#[cfg(test)]
fn nums(lines: &[DiffLine]) -> Vec<(usize, &str)> {
    lines
        .iter()
        .map(|line| (line.line_num, line.content.as_str()))
        .collect()
}

#[test]
fn test_identical_texts() {
    let text = "fn main() {\n    println!(\"hi\");\n}";
    for strategy in [DiffStrategy::Membership, DiffStrategy::Myers] {
        let d = diff_with(text, text, strategy);
        assert!(d.additions.is_empty());
        assert!(d.deletions.is_empty());
        assert_eq!(d.unchanged.len(), 3);
        assert_eq!(d.stats.lines_unchanged, 3);
    }
}

#[test]
fn test_empty_text_has_no_lines() {
    let d = diff("", "");
    assert_eq!(d, Diff::default());

    let d = diff("", "x\ny");
    assert_eq!(nums(&d.additions), vec![(1, "x"), (2, "y")]);
    assert!(d.unchanged.is_empty());

    let d = diff_with("x\ny", "", DiffStrategy::Myers);
    assert_eq!(nums(&d.deletions), vec![(1, "x"), (2, "y")]);
    assert!(d.additions.is_empty());
}

#[test]
fn test_trailing_newline_is_an_empty_line() {
    let d = diff("a", "a\n");
    assert_eq!(nums(&d.additions), vec![(2, "")]);
    assert_eq!(nums(&d.unchanged), vec![(1, "a")]);
}

#[test]
fn test_single_line_edit() {
    let d = diff("a\nb\nc", "a\nx\nc");
    assert_eq!(nums(&d.additions), vec![(2, "x")]);
    assert_eq!(nums(&d.deletions), vec![(2, "b")]);
    assert_eq!(nums(&d.unchanged), vec![(1, "a"), (3, "c")]);

    let m = diff_with("a\nb\nc", "a\nx\nc", DiffStrategy::Myers);
    assert_eq!(m, d);
}

#[test]
fn test_duplicate_lines_under_membership() {
    // "b" is gone, but the second "a" already exists in the old text so it is
    // not an addition.
    let d = diff("a\nb", "a\na");
    assert!(d.additions.is_empty());
    assert_eq!(nums(&d.deletions), vec![(2, "b")]);
    assert_eq!(nums(&d.unchanged), vec![(1, "a"), (2, "a")]);
    assert_eq!(
        d.stats,
        DiffStats {
            lines_added: 0,
            lines_deleted: 1,
            lines_unchanged: 2,
        }
    );
}

#[test]
fn test_duplicate_lines_under_myers() {
    let d = diff_with("a\nb", "a\na", DiffStrategy::Myers);
    assert_eq!(nums(&d.additions), vec![(2, "a")]);
    assert_eq!(nums(&d.deletions), vec![(2, "b")]);
    assert_eq!(nums(&d.unchanged), vec![(1, "a")]);
}

#[test]
fn test_reordering_is_invisible_to_membership() {
    let d = diff("a\nb", "b\na");
    assert_eq!(d.stats.lines_added, 0);
    assert_eq!(d.stats.lines_deleted, 0);
    assert_eq!(d.stats.lines_unchanged, 2);

    let m = diff_with("a\nb", "b\na", DiffStrategy::Myers);
    assert_eq!(m.stats.lines_added, 1);
    assert_eq!(m.stats.lines_deleted, 1);
    assert_eq!(m.stats.lines_unchanged, 1);
}

#[test]
fn test_myers_far_apart_changes() {
    let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n12";
    let new = "one\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n12\n13";
    let d = diff_with(old, new, DiffStrategy::Myers);
    assert_eq!(nums(&d.deletions), vec![(1, "1")]);
    assert_eq!(nums(&d.additions), vec![(1, "one"), (13, "13")]);
    assert_eq!(d.stats.lines_unchanged, 11);
}

#[test]
fn test_strategy_parsing() {
    assert_eq!("myers".parse::<DiffStrategy>(), Ok(DiffStrategy::Myers));
    assert_eq!(DiffStrategy::default().to_string(), "membership");
    assert!("lcs".parse::<DiffStrategy>().is_err());
}

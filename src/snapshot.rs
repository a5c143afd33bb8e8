use std::collections::{btree_map, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    hasher::hash_content,
    model::{FileEntry, FileId},
    object_id::ObjectId,
};

/// What a snapshot remembers about one file.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub name: String,
    /// The [`ObjectId`] of the file's content.
    pub hash: ObjectId,
    pub size: u64,
}

/// The content hashes of every file in a repository at one point in time,
/// keyed by file id.
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<FileId, SnapshotEntry>,
}

impl Snapshot {
    pub fn get(&self, id: &FileId) -> Option<&SnapshotEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &FileId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, FileId, SnapshotEntry> {
        self.entries.iter()
    }
}

impl FromIterator<(FileId, SnapshotEntry)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (FileId, SnapshotEntry)>>(iter: T) -> Self {
        Snapshot {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a FileId, &'a SnapshotEntry);
    type IntoIter = btree_map::Iter<'a, FileId, SnapshotEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Counts of files added, deleted and modified relative to a parent snapshot.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub additions: u64,
    pub deletions: u64,
    pub modifications: u64,
}

/// Hashes every file's content. Fails with [`Error::EmptyRepository`] when
/// there are no files.
pub fn build_snapshot(files: &[FileEntry]) -> Result<Snapshot, Error> {
    if files.is_empty() {
        return Err(Error::EmptyRepository);
    }
    Ok(files
        .iter()
        .map(|file| {
            let entry = SnapshotEntry {
                name: file.name.clone(),
                hash: hash_content(file.content.as_bytes()),
                size: file.size,
            };
            (file.id.clone(), entry)
        })
        .collect())
}

/// Without a parent every file is an addition.
pub fn compute_change_summary(new: &Snapshot, parent: Option<&Snapshot>) -> ChangeSummary {
    let mut summary = ChangeSummary::default();
    for (id, entry) in new {
        match parent.and_then(|parent| parent.get(id)) {
            None => summary.additions += 1,
            Some(old) if old.hash != entry.hash => summary.modifications += 1,
            Some(_) => {}
        }
    }
    if let Some(parent) = parent {
        summary.deletions = parent.iter().filter(|(id, _)| !new.contains(id)).count() as u64;
    }
    summary
}

#[cfg(test)]
use crate::model::RepoId;

#[cfg(test)]
fn file(id: &str, name: &str, content: &str) -> FileEntry {
    let mut file = FileEntry::text(RepoId::from("repo"), name.to_owned(), content.to_owned());
    file.id = FileId::from(id);
    file
}

#[test]
fn test_build_snapshot() {
    let snapshot = build_snapshot(&[file("1", "a.txt", "x"), file("2", "b.txt", "yy")]).unwrap();
    assert_eq!(snapshot.len(), 2);
    let b = snapshot.get(&FileId::from("2")).unwrap();
    assert_eq!(b.name, "b.txt");
    assert_eq!(b.hash, hash_content(b"yy"));
    assert_eq!(b.size, 2);
}

#[test]
fn test_empty_file_set_is_rejected() {
    assert!(matches!(build_snapshot(&[]), Err(Error::EmptyRepository)));
}

#[test]
fn test_first_commit_counts_everything_as_added() {
    let snapshot = build_snapshot(&[file("A", "A", "x"), file("B", "B", "y")]).unwrap();
    assert_eq!(
        compute_change_summary(&snapshot, None),
        ChangeSummary {
            additions: 2,
            deletions: 0,
            modifications: 0,
        }
    );
}

#[test]
fn test_modified_unchanged_and_new() {
    let parent = build_snapshot(&[file("A", "A", "x"), file("B", "B", "y")]).unwrap();
    let new = build_snapshot(&[
        file("A", "A", "x2"),
        file("B", "B", "y"),
        file("C", "C", "z"),
    ])
    .unwrap();
    assert_eq!(
        compute_change_summary(&new, Some(&parent)),
        ChangeSummary {
            additions: 1,
            deletions: 0,
            modifications: 1,
        }
    );
}

#[test]
fn test_deletion_detection() {
    let parent = build_snapshot(&[file("A", "A", "x"), file("B", "B", "y")]).unwrap();
    let new = build_snapshot(&[file("A", "A", "x")]).unwrap();
    assert_eq!(
        compute_change_summary(&new, Some(&parent)),
        ChangeSummary {
            additions: 0,
            deletions: 1,
            modifications: 0,
        }
    );
}

#[test]
fn test_renamed_file_with_same_content_is_unchanged() {
    // Identity is the file id, names are carried along but not compared.
    let parent = build_snapshot(&[file("A", "old.txt", "x")]).unwrap();
    let new = build_snapshot(&[file("A", "new.txt", "x")]).unwrap();
    assert_eq!(compute_change_summary(&new, Some(&parent)), ChangeSummary::default());
}

#[test]
fn test_serializes_as_plain_map() {
    let snapshot = build_snapshot(&[file("b", "b", "y"), file("a", "a", "x")]).unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();
    let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["a", "b"]);
    let back: Snapshot = serde_json::from_value(json).unwrap();
    assert_eq!(back, snapshot);
}

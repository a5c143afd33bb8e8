use crate::{model::RepoId, object_id::ObjectId, snapshot::Snapshot, timestamp::Timestamp};

/// Content address of a blob of bytes.
pub fn hash_content(bytes: &[u8]) -> ObjectId {
    ObjectId::from(bytes)
}

/// Identity of a commit: the hash of the repository id, message, timestamp
/// and the snapshot as compact JSON, concatenated in that order.
///
/// Snapshot entries serialize in file id order whatever order they were
/// inserted in.
pub fn hash_commit(
    repo_id: &RepoId,
    message: &str,
    timestamp: &Timestamp,
    snapshot: &Snapshot,
) -> Result<ObjectId, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(repo_id.as_str().as_bytes());
    hasher.update(message.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    serde_json::to_writer(&mut hasher, snapshot)?;
    Ok(ObjectId::from_hasher(&hasher))
}

#[cfg(test)]
use crate::{model::FileId, snapshot::SnapshotEntry};

#[cfg(test)]
fn entry(name: &str, content: &str) -> SnapshotEntry {
    SnapshotEntry {
        name: name.to_owned(),
        hash: hash_content(content.as_bytes()),
        size: content.len() as u64,
    }
}

#[test]
fn test_hash_content_is_deterministic() {
    assert_eq!(hash_content(b"x"), hash_content(b"x"));
    assert_ne!(hash_content(b"x"), hash_content(b"y"));
    assert_ne!(hash_content(b""), hash_content(b" "));
    assert_eq!(hash_content(b"x").to_string().len(), 40);
}

#[test]
fn test_commit_hash_ignores_insertion_order() {
    let repo = RepoId::from("repo");
    let ts: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();

    let forward: Snapshot = vec![
        (FileId::from("a"), entry("a.txt", "x")),
        (FileId::from("b"), entry("b.txt", "y")),
        (FileId::from("c"), entry("c.txt", "z")),
    ]
    .into_iter()
    .collect();
    let backward: Snapshot = vec![
        (FileId::from("c"), entry("c.txt", "z")),
        (FileId::from("a"), entry("a.txt", "x")),
        (FileId::from("b"), entry("b.txt", "y")),
    ]
    .into_iter()
    .collect();

    assert_eq!(
        hash_commit(&repo, "msg", &ts, &forward).unwrap(),
        hash_commit(&repo, "msg", &ts, &backward).unwrap()
    );
}

#[test]
fn test_commit_hash_covers_every_input() {
    let repo = RepoId::from("repo");
    let ts: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
    let later: Timestamp = "2024-01-01T00:00:01Z".parse().unwrap();
    let snapshot: Snapshot = vec![(FileId::from("a"), entry("a.txt", "x"))]
        .into_iter()
        .collect();
    let changed: Snapshot = vec![(FileId::from("a"), entry("a.txt", "x2"))]
        .into_iter()
        .collect();

    let base = hash_commit(&repo, "msg", &ts, &snapshot).unwrap();
    assert_ne!(base, hash_commit(&RepoId::from("other"), "msg", &ts, &snapshot).unwrap());
    assert_ne!(base, hash_commit(&repo, "msg2", &ts, &snapshot).unwrap());
    assert_ne!(base, hash_commit(&repo, "msg", &later, &snapshot).unwrap());
    assert_ne!(base, hash_commit(&repo, "msg", &ts, &changed).unwrap());
}

#[test]
fn test_commit_hash_is_hash_of_canonical_string() {
    let repo = RepoId::from("repo");
    let ts: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
    let snapshot: Snapshot = vec![(FileId::from("a"), entry("a.txt", "x"))]
        .into_iter()
        .collect();
    let canonical = format!(
        "repomsg2024-01-01T00:00:00.000000Z{}",
        serde_json::to_string(&snapshot).unwrap()
    );
    assert!(canonical.contains(r#"{"a":{"name":"a.txt","hash":""#));
    assert_eq!(
        hash_commit(&repo, "msg", &ts, &snapshot).unwrap(),
        hash_content(canonical.as_bytes())
    );
}

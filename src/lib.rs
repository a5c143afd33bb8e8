//! # Mini Git
//!
//! The versioning core of a small version control service: content hashing,
//! snapshots of a repository's files, a commit DAG built from them, and line
//! diffs between two texts.

mod hex;

/// Commits, their construction, and the commit graph.
pub mod commit;
/// Settings shared by every operation.
pub mod config;
/// Line oriented text comparison.
pub mod diff;
pub mod error;
/// Content and commit hashing.
pub mod hasher;
/// Repositories and the files in their working set.
pub mod model;
/// Hash-based binary object identifier.
pub mod object_id;
/// Content addressible store API using the [`object_id::ObjectId`].
pub mod object_store;
/// Per-file content hashes and the changes between two snapshots.
pub mod snapshot;
/// Storage interfaces the core is handed.
pub mod storage;
pub mod timestamp;
pub mod vcs;

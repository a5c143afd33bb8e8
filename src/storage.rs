//! Capability interfaces through which the core reads and writes its
//! entities. Nothing here holds global state; a [`crate::vcs::Vcs`] is handed
//! its storage explicitly.

use crate::{
    commit::Commit,
    error::Error,
    model::{FileEntry, FileId, RepoId, Repository},
    object_id::ObjectId,
    timestamp::Timestamp,
};

pub mod directory;
pub mod in_memory;

pub trait RepositoryStore {
    fn insert_repository(&self, repository: &Repository) -> Result<(), Error>;

    fn repository(&self, id: &RepoId) -> Result<Option<Repository>, Error>;

    /// Every repository, oldest first.
    fn repositories(&self) -> Result<Vec<Repository>, Error>;

    /// Removes the repository together with its files and commits.
    /// Returns whether there was anything to remove.
    fn delete_repository(&self, id: &RepoId) -> Result<bool, Error>;

    /// Adds `file_delta` to the cached file count and stamps `updated_at`.
    /// The count never drops below zero.
    fn record_change(&self, id: &RepoId, file_delta: i64, at: Timestamp) -> Result<(), Error>;
}

pub trait FileStore {
    /// The working set of a repository, ordered by name.
    fn files(&self, repo: &RepoId) -> Result<Vec<FileEntry>, Error>;

    fn file(&self, repo: &RepoId, id: &FileId) -> Result<Option<FileEntry>, Error>;

    fn file_by_name(&self, repo: &RepoId, name: &str) -> Result<Option<FileEntry>, Error> {
        Ok(self.files(repo)?.into_iter().find(|file| file.name == name))
    }

    /// Inserts the file, or replaces the file with the same id.
    fn put_file(&self, file: &FileEntry) -> Result<(), Error>;

    /// Returns whether there was anything to remove.
    fn delete_file(&self, repo: &RepoId, id: &FileId) -> Result<bool, Error>;
}

/// Append only commit history.
pub trait CommitStore {
    fn append_commit(&self, commit: &Commit) -> Result<(), Error>;

    /// Every commit of a repository in the order they were appended.
    fn commits(&self, repo: &RepoId) -> Result<Vec<Commit>, Error>;

    fn commit(&self, repo: &RepoId, hash: &ObjectId) -> Result<Option<Commit>, Error> {
        Ok(self
            .commits(repo)?
            .into_iter()
            .find(|commit| &commit.hash == hash))
    }

    /// The most recently appended commit.
    fn latest_commit(&self, repo: &RepoId) -> Result<Option<Commit>, Error> {
        Ok(self.commits(repo)?.pop())
    }
}

/// Everything a [`crate::vcs::Vcs`] needs from its storage.
pub trait Storage: RepositoryStore + FileStore + CommitStore {}

impl<T: RepositoryStore + FileStore + CommitStore> Storage for T {}

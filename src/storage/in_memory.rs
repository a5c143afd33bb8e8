use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::{
    commit::Commit,
    error::{Error, NotFound},
    model::{FileEntry, FileId, RepoId, Repository},
    object_id::ObjectId,
    timestamp::Timestamp,
};

use super::{CommitStore, FileStore, RepositoryStore};

#[derive(Debug, Default)]
struct Tables {
    repositories: BTreeMap<RepoId, Repository>,
    files: BTreeMap<RepoId, BTreeMap<FileId, FileEntry>>,
    commits: BTreeMap<RepoId, Vec<Commit>>,
}

/// Storage held entirely in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryStore for InMemoryStorage {
    fn insert_repository(&self, repository: &Repository) -> Result<(), Error> {
        self.tables
            .write()
            .repositories
            .insert(repository.id.clone(), repository.clone());
        Ok(())
    }

    fn repository(&self, id: &RepoId) -> Result<Option<Repository>, Error> {
        Ok(self.tables.read().repositories.get(id).cloned())
    }

    fn repositories(&self) -> Result<Vec<Repository>, Error> {
        let mut repositories: Vec<Repository> =
            self.tables.read().repositories.values().cloned().collect();
        repositories.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(repositories)
    }

    fn delete_repository(&self, id: &RepoId) -> Result<bool, Error> {
        let mut tables = self.tables.write();
        tables.files.remove(id);
        tables.commits.remove(id);
        Ok(tables.repositories.remove(id).is_some())
    }

    fn record_change(&self, id: &RepoId, file_delta: i64, at: Timestamp) -> Result<(), Error> {
        let mut tables = self.tables.write();
        let repository = tables
            .repositories
            .get_mut(id)
            .ok_or_else(|| NotFound::Repository(id.clone()))?;
        repository.file_count = repository.file_count.saturating_add_signed(file_delta);
        repository.updated_at = at;
        Ok(())
    }
}

impl FileStore for InMemoryStorage {
    fn files(&self, repo: &RepoId) -> Result<Vec<FileEntry>, Error> {
        let mut files: Vec<FileEntry> = self
            .tables
            .read()
            .files
            .get(repo)
            .map(|files| files.values().cloned().collect())
            .unwrap_or_default();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn file(&self, repo: &RepoId, id: &FileId) -> Result<Option<FileEntry>, Error> {
        Ok(self
            .tables
            .read()
            .files
            .get(repo)
            .and_then(|files| files.get(id))
            .cloned())
    }

    fn put_file(&self, file: &FileEntry) -> Result<(), Error> {
        let mut tables = self.tables.write();
        if !tables.repositories.contains_key(&file.repo_id) {
            return Err(NotFound::Repository(file.repo_id.clone()).into());
        }
        tables
            .files
            .entry(file.repo_id.clone())
            .or_default()
            .insert(file.id.clone(), file.clone());
        Ok(())
    }

    fn delete_file(&self, repo: &RepoId, id: &FileId) -> Result<bool, Error> {
        Ok(self
            .tables
            .write()
            .files
            .get_mut(repo)
            .and_then(|files| files.remove(id))
            .is_some())
    }
}

impl CommitStore for InMemoryStorage {
    fn append_commit(&self, commit: &Commit) -> Result<(), Error> {
        let mut tables = self.tables.write();
        if !tables.repositories.contains_key(&commit.repo_id) {
            return Err(NotFound::Repository(commit.repo_id.clone()).into());
        }
        tables
            .commits
            .entry(commit.repo_id.clone())
            .or_default()
            .push(commit.clone());
        Ok(())
    }

    fn commits(&self, repo: &RepoId) -> Result<Vec<Commit>, Error> {
        Ok(self
            .tables
            .read()
            .commits
            .get(repo)
            .cloned()
            .unwrap_or_default())
    }

    fn commit(&self, repo: &RepoId, hash: &ObjectId) -> Result<Option<Commit>, Error> {
        Ok(self
            .tables
            .read()
            .commits
            .get(repo)
            .and_then(|commits| commits.iter().find(|commit| &commit.hash == hash))
            .cloned())
    }

    fn latest_commit(&self, repo: &RepoId) -> Result<Option<Commit>, Error> {
        Ok(self
            .tables
            .read()
            .commits
            .get(repo)
            .and_then(|commits| commits.last())
            .cloned())
    }
}

#[cfg(test)]
use crate::commit::create_commit;

#[test]
fn test_files_are_scoped_to_their_repository() {
    let storage = InMemoryStorage::new();
    let a = Repository::new("a".into(), String::new(), "main".into());
    let b = Repository::new("b".into(), String::new(), "main".into());
    storage.insert_repository(&a).unwrap();
    storage.insert_repository(&b).unwrap();

    let file = FileEntry::text(a.id.clone(), "x.txt".into(), "x".into());
    storage.put_file(&file).unwrap();
    assert_eq!(storage.files(&a.id).unwrap(), vec![file.clone()]);
    assert!(storage.files(&b.id).unwrap().is_empty());
    assert_eq!(storage.file_by_name(&a.id, "x.txt").unwrap(), Some(file.clone()));
    assert_eq!(storage.file(&b.id, &file.id).unwrap(), None);

    assert!(!storage.delete_file(&b.id, &file.id).unwrap());
    assert!(storage.delete_file(&a.id, &file.id).unwrap());
    assert!(storage.files(&a.id).unwrap().is_empty());
}

#[test]
fn test_put_file_requires_repository() {
    let storage = InMemoryStorage::new();
    let file = FileEntry::text(RepoId::from("nope"), "x.txt".into(), "x".into());
    assert!(storage.put_file(&file).unwrap_err().is_not_found());
}

#[test]
fn test_record_change_never_goes_negative() {
    let storage = InMemoryStorage::new();
    let repo = Repository::new("a".into(), String::new(), "main".into());
    storage.insert_repository(&repo).unwrap();
    let later: Timestamp = "2100-01-01T00:00:00Z".parse().unwrap();
    storage.record_change(&repo.id, 2, later).unwrap();
    storage.record_change(&repo.id, -5, later).unwrap();
    let stored = storage.repository(&repo.id).unwrap().unwrap();
    assert_eq!(stored.file_count, 0);
    assert_eq!(stored.updated_at, later);
}

#[test]
fn test_delete_cascades() {
    let storage = InMemoryStorage::new();
    let repo = Repository::new("a".into(), String::new(), "main".into());
    storage.insert_repository(&repo).unwrap();
    let file = FileEntry::text(repo.id.clone(), "x.txt".into(), "x".into());
    storage.put_file(&file).unwrap();
    let commit = create_commit(&repo.id, "m", "me", &[file], None, Timestamp::now()).unwrap();
    storage.append_commit(&commit).unwrap();
    assert_eq!(storage.latest_commit(&repo.id).unwrap(), Some(commit.clone()));
    assert_eq!(storage.commit(&repo.id, &commit.hash).unwrap(), Some(commit));

    assert!(storage.delete_repository(&repo.id).unwrap());
    assert!(!storage.delete_repository(&repo.id).unwrap());
    assert!(storage.files(&repo.id).unwrap().is_empty());
    assert!(storage.commits(&repo.id).unwrap().is_empty());
    assert_eq!(storage.repository(&repo.id).unwrap(), None);
}

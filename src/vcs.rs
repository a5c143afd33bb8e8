//! The operations an outer shell (HTTP, CLI, ...) calls into.
//!
//! A [`Vcs`] owns nothing but handles: its storage, its content store and its
//! configuration. Mutations of one repository are serialized through a
//! per-repository lock so that the parent of every commit is the commit
//! before it, and so that file count updates are never lost. Different
//! repositories never wait on each other.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    commit::{build_graph, create_commit, Commit, CommitGraph},
    config::Config,
    diff::{diff_with, Diff, DiffStrategy},
    error::{Error, NotFound},
    model::{decode_upload, FileEntry, FileId, RepoId, Repository},
    object_id::ObjectId,
    object_store::ObjectStore,
    storage::Storage,
    timestamp::Timestamp,
};

/// A file's current content compared with what a commit recorded for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub file_name: String,
    pub file_id: FileId,
    /// The commit compared against, if the repository had one.
    pub commit_hash: Option<ObjectId>,
    pub diff: Diff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub message: String,
    pub commit: Commit,
    pub files_in_commit: usize,
}

pub struct Vcs<S, B> {
    storage: S,
    blobs: Mutex<B>,
    config: Config,
    locks: Mutex<HashMap<RepoId, Arc<Mutex<()>>>>,
}

impl<S, B> Vcs<S, B>
where
    S: Storage,
    B: ObjectStore,
    Error: From<B::Error>,
{
    pub fn new(storage: S, blobs: B, config: Config) -> Self {
        Vcs {
            storage,
            blobs: Mutex::new(blobs),
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The lock serializing mutations of `id`. Only existing repositories get
    /// one; callers still check for the repository again once they hold it.
    fn repo_lock(&self, id: &RepoId) -> Result<Arc<Mutex<()>>, Error> {
        self.repository(id)?;
        Ok(self.locks.lock().entry(id.clone()).or_default().clone())
    }

    /// Puts the working set back the way it was before `written` was stored.
    fn undo_put(&self, written: &FileEntry, previous: Option<&FileEntry>) {
        let undone = match previous {
            Some(previous) => self.storage.put_file(previous),
            None => self
                .storage
                .delete_file(&written.repo_id, &written.id)
                .map(|_| ()),
        };
        if let Err(err) = undone {
            log::error!("could not undo write of file {}: {}", written.id, err);
        }
    }

    pub fn create_repository(&self, name: &str, description: &str) -> Result<Repository, Error> {
        let repository = Repository::new(
            name.to_owned(),
            description.to_owned(),
            self.config.default_branch.clone(),
        );
        self.storage.insert_repository(&repository)?;
        log::info!("created repository {} ({})", repository.id, repository.name);
        Ok(repository)
    }

    pub fn repositories(&self) -> Result<Vec<Repository>, Error> {
        self.storage.repositories()
    }

    pub fn repository(&self, id: &RepoId) -> Result<Repository, Error> {
        self.storage
            .repository(id)?
            .ok_or_else(|| NotFound::Repository(id.clone()).into())
    }

    pub fn delete_repository(&self, id: &RepoId) -> Result<(), Error> {
        let lock = self.repo_lock(id)?;
        let guard = lock.lock();
        let deleted = self.storage.delete_repository(id)?;
        drop(guard);
        self.locks.lock().remove(id);
        if !deleted {
            return Err(NotFound::Repository(id.clone()).into());
        }
        log::info!("deleted repository {}", id);
        Ok(())
    }

    /// Stores `file` under its name, reusing the id of an existing file with
    /// that name. Only new names change the file count. If the count cannot
    /// be changed the write is undone.
    fn upsert(&self, file: FileEntry) -> Result<FileEntry, Error> {
        let repo = file.repo_id.clone();
        let lock = self.repo_lock(&repo)?;
        let _guard = lock.lock();
        self.repository(&repo)?;

        let previous = self.storage.file_by_name(&repo, &file.name)?;
        let (file, delta) = match &previous {
            Some(existing) => (file.replacing(existing), 0),
            None => (file, 1),
        };
        self.storage.put_file(&file)?;
        if let Err(err) = self.storage.record_change(&repo, delta, Timestamp::now()) {
            self.undo_put(&file, previous.as_ref());
            return Err(err);
        }
        log::info!(
            "{} file {} ({}) in repository {}",
            if delta == 0 { "replaced" } else { "added" },
            file.id,
            file.name,
            repo
        );
        Ok(file)
    }

    /// Creates a text file, or replaces the content of the file with that name.
    pub fn put_file(&self, repo: &RepoId, name: &str, content: &str) -> Result<FileEntry, Error> {
        self.upsert(FileEntry::text(
            repo.clone(),
            name.to_owned(),
            content.to_owned(),
        ))
    }

    /// Stores raw bytes under `name`; see [`decode_upload`] for how they are
    /// encoded.
    pub fn upload_file(
        &self,
        repo: &RepoId,
        name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<FileEntry, Error> {
        let upload = decode_upload(bytes, content_type);
        self.upsert(FileEntry::upload(repo.clone(), name.to_owned(), upload))
    }

    pub fn update_file(&self, repo: &RepoId, id: &FileId, content: &str) -> Result<FileEntry, Error> {
        let lock = self.repo_lock(repo)?;
        let _guard = lock.lock();
        let previous = self.file(repo, id)?;
        let mut file = previous.clone();
        file.set_text(content.to_owned());
        self.storage.put_file(&file)?;
        if let Err(err) = self.storage.record_change(repo, 0, Timestamp::now()) {
            self.undo_put(&file, Some(&previous));
            return Err(err);
        }
        log::info!("updated file {} ({}) in repository {}", file.id, file.name, repo);
        Ok(file)
    }

    pub fn file(&self, repo: &RepoId, id: &FileId) -> Result<FileEntry, Error> {
        self.storage
            .file(repo, id)?
            .ok_or_else(|| NotFound::File(id.clone()).into())
    }

    pub fn file_by_name(&self, repo: &RepoId, name: &str) -> Result<FileEntry, Error> {
        self.storage
            .file_by_name(repo, name)?
            .ok_or_else(|| NotFound::FileName(name.to_owned()).into())
    }

    pub fn files(&self, repo: &RepoId) -> Result<Vec<FileEntry>, Error> {
        self.repository(repo)?;
        self.storage.files(repo)
    }

    pub fn delete_file(&self, repo: &RepoId, id: &FileId) -> Result<(), Error> {
        let lock = self.repo_lock(repo)?;
        let _guard = lock.lock();
        let file = self.file(repo, id)?;
        if !self.storage.delete_file(repo, id)? {
            return Err(NotFound::File(id.clone()).into());
        }
        if let Err(err) = self.storage.record_change(repo, -1, Timestamp::now()) {
            if let Err(undo) = self.storage.put_file(&file) {
                log::error!("could not restore deleted file {}: {}", id, undo);
            }
            return Err(err);
        }
        log::info!("deleted file {} from repository {}", id, repo);
        Ok(())
    }

    /// Records the current files as a new commit on top of the latest one.
    ///
    /// File contents are put in the content store and the repository is
    /// stamped before the commit is appended, so a visible commit can always
    /// be diffed against and an error always means no commit was made.
    pub fn commit(&self, repo: &RepoId, message: &str, author: Option<&str>) -> Result<Commit, Error> {
        let lock = self.repo_lock(repo)?;
        let _guard = lock.lock();
        self.repository(repo)?;

        let files = self.storage.files(repo)?;
        let parent = self.storage.latest_commit(repo)?;
        let created_at = match &parent {
            Some(parent) => Timestamp::now().strictly_after(parent.created_at),
            None => Timestamp::now(),
        };
        let author = author.unwrap_or(&self.config.default_author);
        let commit = create_commit(repo, message, author, &files, parent.as_ref(), created_at)?;

        {
            let mut blobs = self.blobs.lock();
            for file in &files {
                blobs.insert(file.content.as_bytes())?;
            }
        }
        self.storage.record_change(repo, 0, Timestamp::now())?;
        self.storage.append_commit(&commit)?;

        log::info!(
            "committed {} to repository {}: +{} -{} ~{}",
            commit.hash.short(),
            repo,
            commit.changes_summary.additions,
            commit.changes_summary.deletions,
            commit.changes_summary.modifications
        );
        Ok(commit)
    }

    /// History, newest first, at most `limit` (or the configured limit)
    /// commits long.
    pub fn commits(&self, repo: &RepoId, limit: Option<usize>) -> Result<Vec<Commit>, Error> {
        self.repository(repo)?;
        let limit = limit.unwrap_or(self.config.history_limit);
        let mut commits = self.storage.commits(repo)?;
        commits.reverse();
        commits.truncate(limit);
        Ok(commits)
    }

    pub fn commit_by_hash(&self, repo: &RepoId, hash: &ObjectId) -> Result<Commit, Error> {
        self.storage
            .commit(repo, hash)?
            .ok_or_else(|| NotFound::Commit(*hash).into())
    }

    pub fn graph(&self, repo: &RepoId) -> Result<CommitGraph, Error> {
        self.repository(repo)?;
        Ok(build_graph(&self.storage.commits(repo)?))
    }

    fn recorded_content(&self, commit: &Commit, file: &FileId) -> Result<String, Error> {
        let Some(entry) = commit.snapshot.get(file) else {
            return Ok(String::new());
        };
        let bytes = self
            .blobs
            .lock()
            .read(entry.hash)?
            .ok_or(Error::ContentUnavailable(entry.hash))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Compares a file's current content with its content at `commit`, or at
    /// the latest commit when none is named. A file the commit does not
    /// contain is compared with empty content.
    pub fn diff_file(
        &self,
        repo: &RepoId,
        file_id: &FileId,
        commit: Option<&ObjectId>,
        strategy: Option<DiffStrategy>,
    ) -> Result<FileDiff, Error> {
        let file = self.file(repo, file_id)?;
        let commit = match commit {
            Some(hash) => Some(self.commit_by_hash(repo, hash)?),
            None => self.storage.latest_commit(repo)?,
        };
        let old_content = match &commit {
            Some(commit) => self.recorded_content(commit, file_id)?,
            None => String::new(),
        };
        let strategy = strategy.unwrap_or(self.config.diff_strategy);
        log::debug!("diffing {} with {} strategy", file.name, strategy);
        Ok(FileDiff {
            diff: diff_with(&old_content, &file.content, strategy),
            file_name: file.name,
            file_id: file.id,
            commit_hash: commit.map(|commit| commit.hash),
        })
    }

    /// Looks a commit up for checkout. The working files are left untouched.
    pub fn checkout(&self, repo: &RepoId, hash: &ObjectId) -> Result<Checkout, Error> {
        let commit = self.commit_by_hash(repo, hash)?;
        Ok(Checkout {
            message: format!("Repository checked out to commit {}", commit.hash.short()),
            files_in_commit: commit.snapshot.len(),
            commit,
        })
    }
}

#[cfg(test)]
use crate::{
    object_store::{directory::DirectoryObjectStore, in_memory::InMemoryObjectStore},
    storage::{
        directory::DirectoryStorage, in_memory::InMemoryStorage, CommitStore, FileStore,
        RepositoryStore,
    },
};

#[cfg(test)]
fn in_memory() -> Vcs<InMemoryStorage, InMemoryObjectStore> {
    Vcs::new(
        InMemoryStorage::new(),
        InMemoryObjectStore::new(),
        Config::default(),
    )
}

#[test]
fn test_repository_lifecycle() {
    let vcs = in_memory();
    let repo = vcs.create_repository("demo", "a demo").unwrap();
    assert_eq!(repo.default_branch, "main");
    assert_eq!(repo.file_count, 0);
    assert_eq!(vcs.repositories().unwrap(), vec![repo.clone()]);
    assert_eq!(vcs.repository(&repo.id).unwrap(), repo);

    vcs.delete_repository(&repo.id).unwrap();
    assert!(vcs.repository(&repo.id).unwrap_err().is_not_found());
    assert!(vcs.delete_repository(&repo.id).unwrap_err().is_not_found());
}

#[test]
fn test_file_count_follows_the_file_set() {
    let vcs = in_memory();
    let repo = vcs.create_repository("demo", "").unwrap();
    let a = vcs.put_file(&repo.id, "a.txt", "x").unwrap();
    let again = vcs.put_file(&repo.id, "a.txt", "x2").unwrap();
    assert_eq!(again.id, a.id);
    vcs.put_file(&repo.id, "b.txt", "y").unwrap();
    assert_eq!(vcs.repository(&repo.id).unwrap().file_count, 2);
    assert_eq!(vcs.files(&repo.id).unwrap().len(), 2);

    vcs.delete_file(&repo.id, &a.id).unwrap();
    assert_eq!(vcs.repository(&repo.id).unwrap().file_count, 1);
    assert!(vcs.delete_file(&repo.id, &a.id).unwrap_err().is_not_found());
    assert_eq!(vcs.repository(&repo.id).unwrap().file_count, 1);
}

#[test]
fn test_update_file_keeps_identity() {
    let vcs = in_memory();
    let repo = vcs.create_repository("demo", "").unwrap();
    let file = vcs.put_file(&repo.id, "a.txt", "x").unwrap();
    let updated = vcs.update_file(&repo.id, &file.id, "hello").unwrap();
    assert_eq!(updated.id, file.id);
    assert_eq!(updated.size, 5);
    assert_eq!(vcs.file(&repo.id, &file.id).unwrap().content, "hello");
    assert_eq!(vcs.file_by_name(&repo.id, "a.txt").unwrap().id, file.id);
    assert!(vcs
        .update_file(&repo.id, &FileId::from("missing"), "x")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_files_of_missing_repository() {
    let vcs = in_memory();
    let missing = RepoId::from("missing");
    assert!(vcs.put_file(&missing, "a", "x").unwrap_err().is_not_found());
    assert!(vcs.files(&missing).unwrap_err().is_not_found());
    assert!(vcs.commit(&missing, "m", None).unwrap_err().is_not_found());
}

#[test]
fn test_upload() {
    let vcs = in_memory();
    let repo = vcs.create_repository("demo", "").unwrap();
    let text = vcs
        .upload_file(&repo.id, "notes.txt", b"line".to_vec(), Some("text/plain"))
        .unwrap();
    assert!(!text.encoding.is_binary());
    let image = vcs
        .upload_file(&repo.id, "logo.png", vec![0x89, 0x50, 0x4e, 0x47], Some("image/png"))
        .unwrap();
    assert!(image.encoding.is_binary());
    assert_eq!(image.size, 4);
    assert_eq!(image.mime_type, "image/png");
    let replaced = vcs
        .upload_file(&repo.id, "notes.txt", b"other".to_vec(), None)
        .unwrap();
    assert_eq!(replaced.id, text.id);
    assert_eq!(vcs.repository(&repo.id).unwrap().file_count, 2);
}

#[test]
fn test_commit_history() {
    let vcs = in_memory();
    let repo = vcs.create_repository("demo", "").unwrap();
    assert!(matches!(
        vcs.commit(&repo.id, "empty", None),
        Err(Error::EmptyRepository)
    ));
    assert!(vcs.commits(&repo.id, None).unwrap().is_empty());

    let a = vcs.put_file(&repo.id, "A", "x").unwrap();
    vcs.put_file(&repo.id, "B", "y").unwrap();
    let first = vcs.commit(&repo.id, "first", None).unwrap();
    assert_eq!(first.author, "Anonymous");
    assert!(first.parent_commits.is_empty());
    assert_eq!(first.changes_summary.additions, 2);

    vcs.update_file(&repo.id, &a.id, "x2").unwrap();
    vcs.put_file(&repo.id, "C", "z").unwrap();
    let second = vcs.commit(&repo.id, "second", Some("dev")).unwrap();
    assert_eq!(second.author, "dev");
    assert_eq!(second.parent_commits, vec![first.hash]);
    assert_eq!(second.changes_summary.additions, 1);
    assert_eq!(second.changes_summary.modifications, 1);
    assert_eq!(second.changes_summary.deletions, 0);
    assert!(second.created_at > first.created_at);

    vcs.delete_file(&repo.id, &a.id).unwrap();
    let third = vcs.commit(&repo.id, "third", None).unwrap();
    assert_eq!(third.changes_summary.deletions, 1);

    let history = vcs.commits(&repo.id, None).unwrap();
    let hashes: Vec<ObjectId> = history.iter().map(|c| c.hash).collect();
    assert_eq!(hashes, vec![third.hash, second.hash, first.hash]);
    assert_eq!(vcs.commits(&repo.id, Some(1)).unwrap(), vec![third.clone()]);
    assert_eq!(vcs.commit_by_hash(&repo.id, &second.hash).unwrap(), second);
    assert!(vcs
        .commit_by_hash(&repo.id, &ObjectId::from(&b"nope"[..]))
        .unwrap_err()
        .is_not_found());

    let graph = vcs.graph(&repo.id).unwrap();
    assert_eq!(graph.total_commits, 3);
    assert_eq!(graph.edges.len(), 2);
    assert_eq!(graph.heads(), vec![third.hash]);

    let checkout = vcs.checkout(&repo.id, &second.hash).unwrap();
    assert_eq!(checkout.files_in_commit, 3);
    assert_eq!(checkout.commit, second);
    assert!(checkout.message.ends_with(&second.hash.short()));
    assert_eq!(vcs.files(&repo.id).unwrap().len(), 2);
}

#[test]
fn test_diff_against_history() {
    let vcs = in_memory();
    let repo = vcs.create_repository("demo", "").unwrap();
    let file = vcs.put_file(&repo.id, "a.txt", "one\ntwo\nthree").unwrap();

    let no_history = vcs.diff_file(&repo.id, &file.id, None, None).unwrap();
    assert_eq!(no_history.commit_hash, None);
    assert_eq!(no_history.diff.stats.lines_added, 3);

    let first = vcs.commit(&repo.id, "first", None).unwrap();
    vcs.update_file(&repo.id, &file.id, "one\n2\nthree\nfour").unwrap();

    let result = vcs.diff_file(&repo.id, &file.id, Some(&first.hash), None).unwrap();
    assert_eq!(result.file_name, "a.txt");
    assert_eq!(result.commit_hash, Some(first.hash));
    assert_eq!(result.diff.stats.lines_added, 2);
    assert_eq!(result.diff.stats.lines_deleted, 1);
    assert_eq!(result.diff.stats.lines_unchanged, 2);
    assert_eq!(result.diff.deletions[0].content, "two");

    let latest = vcs
        .diff_file(&repo.id, &file.id, None, Some(DiffStrategy::Myers))
        .unwrap();
    assert_eq!(latest.commit_hash, Some(first.hash));
    assert_eq!(latest.diff.stats.lines_added, 2);

    let newcomer = vcs.put_file(&repo.id, "b.txt", "fresh").unwrap();
    let result = vcs.diff_file(&repo.id, &newcomer.id, Some(&first.hash), None).unwrap();
    assert_eq!(result.diff.stats.lines_added, 1);
    assert!(result.diff.deletions.is_empty());
}

#[test]
fn test_diff_with_missing_content_is_an_error() {
    let vcs = in_memory();
    let repo = vcs.create_repository("demo", "").unwrap();
    let file = vcs.put_file(&repo.id, "a.txt", "x").unwrap();
    // A commit that reached storage without its content.
    let orphan = create_commit(&repo.id, "m", "me", &[file.clone()], None, Timestamp::now()).unwrap();
    vcs.storage().append_commit(&orphan).unwrap();
    assert!(matches!(
        vcs.diff_file(&repo.id, &file.id, Some(&orphan.hash), None),
        Err(Error::ContentUnavailable(_))
    ));
}

#[test]
fn test_concurrent_commits_form_a_chain() {
    let vcs = in_memory();
    let repo = vcs.create_repository("busy", "").unwrap();
    let other = vcs.create_repository("quiet", "").unwrap();
    vcs.put_file(&other.id, "o.txt", "o").unwrap();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let vcs = &vcs;
            let repo = &repo;
            scope.spawn(move || {
                vcs.put_file(&repo.id, &format!("f{}.txt", i), "data").unwrap();
                vcs.commit(&repo.id, &format!("commit {}", i), None).unwrap();
            });
        }
        scope.spawn(|| vcs.commit(&other.id, "independent", None).unwrap());
    });

    assert_eq!(vcs.repository(&repo.id).unwrap().file_count, 8);
    let graph = vcs.graph(&repo.id).unwrap();
    assert_eq!(graph.total_commits, 8);
    assert_eq!(graph.edges.len(), 7);
    assert_eq!(graph.roots().len(), 1);
    assert_eq!(graph.heads().len(), 1);
    for (newer, older) in vcs.commits(&repo.id, None).unwrap().windows(2).map(|w| (&w[0], &w[1])) {
        assert_eq!(newer.parent_commits, vec![older.hash]);
    }
    assert_eq!(vcs.graph(&other.id).unwrap().total_commits, 1);
}

#[test]
fn test_directory_backed_vcs_survives_reopen() {
    let tempdir = tempfile::tempdir().unwrap();
    let open = || {
        Vcs::new(
            DirectoryStorage::new(tempdir.path().join("data")).unwrap(),
            DirectoryObjectStore::new(tempdir.path().join("objects")).unwrap(),
            Config::default(),
        )
    };

    let vcs = open();
    let repo = vcs.create_repository("persisted", "").unwrap();
    let file = vcs.put_file(&repo.id, "a.txt", "a\nb").unwrap();
    let first = vcs.commit(&repo.id, "first", None).unwrap();
    vcs.put_file(&repo.id, "a.txt", "a\nc").unwrap();
    let second = vcs.commit(&repo.id, "second", None).unwrap();
    let graph = vcs.graph(&repo.id).unwrap();
    drop(vcs);

    let vcs = open();
    assert_eq!(vcs.graph(&repo.id).unwrap(), graph);
    assert_eq!(vcs.commit_by_hash(&repo.id, &first.hash).unwrap(), first);
    assert_eq!(vcs.commits(&repo.id, None).unwrap()[0], second);
    let diff = vcs.diff_file(&repo.id, &file.id, Some(&first.hash), None).unwrap();
    assert_eq!(diff.diff.deletions[0].content, "b");
    assert_eq!(diff.diff.additions[0].content, "c");

    vcs.delete_repository(&repo.id).unwrap();
    assert!(vcs.repositories().unwrap().is_empty());
}

/// Storage whose next `record_change` fails after `fail_next_change(true)`.
#[cfg(test)]
#[derive(Default)]
struct FailingStorage {
    inner: InMemoryStorage,
    fail_changes: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl FailingStorage {
    fn fail_next_change(&self, fail: bool) {
        self.fail_changes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl RepositoryStore for FailingStorage {
    fn insert_repository(&self, repository: &Repository) -> Result<(), Error> {
        self.inner.insert_repository(repository)
    }

    fn repository(&self, id: &RepoId) -> Result<Option<Repository>, Error> {
        self.inner.repository(id)
    }

    fn repositories(&self) -> Result<Vec<Repository>, Error> {
        self.inner.repositories()
    }

    fn delete_repository(&self, id: &RepoId) -> Result<bool, Error> {
        self.inner.delete_repository(id)
    }

    fn record_change(&self, id: &RepoId, file_delta: i64, at: Timestamp) -> Result<(), Error> {
        if self
            .fail_changes
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.inner.record_change(id, file_delta, at)
    }
}

#[cfg(test)]
impl FileStore for FailingStorage {
    fn files(&self, repo: &RepoId) -> Result<Vec<FileEntry>, Error> {
        self.inner.files(repo)
    }

    fn file(&self, repo: &RepoId, id: &FileId) -> Result<Option<FileEntry>, Error> {
        self.inner.file(repo, id)
    }

    fn put_file(&self, file: &FileEntry) -> Result<(), Error> {
        self.inner.put_file(file)
    }

    fn delete_file(&self, repo: &RepoId, id: &FileId) -> Result<bool, Error> {
        self.inner.delete_file(repo, id)
    }
}

#[cfg(test)]
impl CommitStore for FailingStorage {
    fn append_commit(&self, commit: &Commit) -> Result<(), Error> {
        self.inner.append_commit(commit)
    }

    fn commits(&self, repo: &RepoId) -> Result<Vec<Commit>, Error> {
        self.inner.commits(repo)
    }
}

#[cfg(test)]
fn failing() -> Vcs<FailingStorage, InMemoryObjectStore> {
    Vcs::new(
        FailingStorage::default(),
        InMemoryObjectStore::new(),
        Config::default(),
    )
}

#[test]
fn test_failed_count_change_leaves_no_file_behind() {
    let vcs = failing();
    let repo = vcs.create_repository("demo", "").unwrap();

    vcs.storage().fail_next_change(true);
    assert!(vcs.put_file(&repo.id, "a.txt", "x").is_err());
    assert!(vcs.files(&repo.id).unwrap().is_empty());
    assert_eq!(vcs.repository(&repo.id).unwrap().file_count, 0);

    let file = vcs.put_file(&repo.id, "a.txt", "x").unwrap();
    assert_eq!(vcs.files(&repo.id).unwrap().len(), 1);
    assert_eq!(vcs.repository(&repo.id).unwrap().file_count, 1);

    vcs.storage().fail_next_change(true);
    assert!(vcs.put_file(&repo.id, "a.txt", "y").is_err());
    assert_eq!(vcs.file(&repo.id, &file.id).unwrap().content, "x");

    vcs.storage().fail_next_change(true);
    assert!(vcs.update_file(&repo.id, &file.id, "z").is_err());
    assert_eq!(vcs.file(&repo.id, &file.id).unwrap(), file);

    vcs.storage().fail_next_change(true);
    assert!(vcs.delete_file(&repo.id, &file.id).is_err());
    assert_eq!(vcs.file(&repo.id, &file.id).unwrap(), file);
    assert_eq!(vcs.repository(&repo.id).unwrap().file_count, 1);

    vcs.delete_file(&repo.id, &file.id).unwrap();
    assert!(vcs.files(&repo.id).unwrap().is_empty());
    assert_eq!(vcs.repository(&repo.id).unwrap().file_count, 0);
}

#[test]
fn test_failed_commit_is_not_visible() {
    let vcs = failing();
    let repo = vcs.create_repository("demo", "").unwrap();
    vcs.put_file(&repo.id, "a.txt", "x").unwrap();

    vcs.storage().fail_next_change(true);
    assert!(vcs.commit(&repo.id, "first", None).is_err());
    assert!(vcs.commits(&repo.id, None).unwrap().is_empty());

    let commit = vcs.commit(&repo.id, "first", None).unwrap();
    assert_eq!(vcs.commits(&repo.id, None).unwrap(), vec![commit]);
}

#[test]
fn test_unknown_repositories_get_no_lock() {
    let vcs = in_memory();
    let missing = RepoId::from("missing");
    assert!(vcs.put_file(&missing, "a", "x").unwrap_err().is_not_found());
    assert!(vcs
        .update_file(&missing, &FileId::from("f"), "x")
        .unwrap_err()
        .is_not_found());
    assert!(vcs
        .delete_file(&missing, &FileId::from("f"))
        .unwrap_err()
        .is_not_found());
    assert!(vcs.commit(&missing, "m", None).unwrap_err().is_not_found());
    assert!(vcs.locks.lock().is_empty());

    let repo = vcs.create_repository("demo", "").unwrap();
    vcs.put_file(&repo.id, "a", "x").unwrap();
    assert_eq!(vcs.locks.lock().len(), 1);
    vcs.delete_repository(&repo.id).unwrap();
    assert!(vcs.locks.lock().is_empty());
}

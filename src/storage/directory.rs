use std::{
    fs::{create_dir_all, read_dir, remove_dir_all, remove_file, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    commit::Commit,
    error::{Error, NotFound},
    model::{FileEntry, FileId, RepoId, Repository},
    timestamp::Timestamp,
};

use super::{CommitStore, FileStore, RepositoryStore};

/// Storage kept as JSON documents under a root directory:
///
/// ```text
/// <root>/repositories/<repo id>/repository.json
/// <root>/repositories/<repo id>/files/<file id>.json
/// <root>/repositories/<repo id>/commits.json
/// ```
///
/// Every document is replaced atomically. Writers to one repository are
/// expected to be serialized by the caller.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

/// Ids become path components, so anything that could escape the root is
/// treated as an id that does not exist.
fn is_plain_component(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}

impl DirectoryStorage {
    pub fn new(root: PathBuf) -> Result<Self, Error> {
        let repositories = root.join("repositories");
        if !repositories.try_exists()? {
            log::info!("creating storage root: {:?}", root);
            create_dir_all(&repositories)?;
        }
        Ok(Self { root })
    }

    fn repo_dir(&self, id: &RepoId) -> Option<PathBuf> {
        is_plain_component(id.as_str()).then(|| self.root.join("repositories").join(id.as_str()))
    }

    fn existing_repo_dir(&self, id: &RepoId) -> Result<PathBuf, Error> {
        match self.repo_dir(id) {
            Some(dir) if dir.join("repository.json").try_exists()? => Ok(dir),
            _ => Err(NotFound::Repository(id.clone()).into()),
        }
    }

    fn file_path(&self, repo: &RepoId, id: &FileId) -> Option<PathBuf> {
        let dir = self.repo_dir(repo)?;
        is_plain_component(id.as_str()).then(|| dir.join("files").join(format!("{}.json", id)))
    }
}

fn read_json<A: DeserializeOwned>(path: &Path) -> Result<Option<A>, Error> {
    match File::options().read(true).open(path) {
        Ok(file) => Ok(Some(serde_json::from_reader(file)?)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn write_json<A: Serialize>(thing: &A, path: &Path) -> Result<(), Error> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut file, thing)?;
    file.flush()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn json_documents(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let entries = match read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    Ok(paths)
}

impl RepositoryStore for DirectoryStorage {
    fn insert_repository(&self, repository: &Repository) -> Result<(), Error> {
        let dir = self
            .repo_dir(&repository.id)
            .ok_or_else(|| NotFound::Repository(repository.id.clone()))?;
        log::info!("writing repository {} to {:?}", repository.id, dir);
        write_json(repository, &dir.join("repository.json"))
    }

    fn repository(&self, id: &RepoId) -> Result<Option<Repository>, Error> {
        match self.repo_dir(id) {
            Some(dir) => read_json(&dir.join("repository.json")),
            None => Ok(None),
        }
    }

    fn repositories(&self) -> Result<Vec<Repository>, Error> {
        let mut repositories = Vec::new();
        for entry in read_dir(self.root.join("repositories"))? {
            let path = entry?.path().join("repository.json");
            if let Some(repository) = read_json::<Repository>(&path)? {
                repositories.push(repository);
            }
        }
        repositories.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(repositories)
    }

    fn delete_repository(&self, id: &RepoId) -> Result<bool, Error> {
        let dir = match self.existing_repo_dir(id) {
            Ok(dir) => dir,
            Err(Error::NotFound(_)) => return Ok(false),
            Err(err) => return Err(err),
        };
        log::info!("removing repository {} at {:?}", id, dir);
        remove_dir_all(dir)?;
        Ok(true)
    }

    fn record_change(&self, id: &RepoId, file_delta: i64, at: Timestamp) -> Result<(), Error> {
        let path = self.existing_repo_dir(id)?.join("repository.json");
        let mut repository: Repository =
            read_json(&path)?.ok_or_else(|| NotFound::Repository(id.clone()))?;
        repository.file_count = repository.file_count.saturating_add_signed(file_delta);
        repository.updated_at = at;
        write_json(&repository, &path)
    }
}

impl FileStore for DirectoryStorage {
    fn files(&self, repo: &RepoId) -> Result<Vec<FileEntry>, Error> {
        let dir = match self.repo_dir(repo) {
            Some(dir) => dir.join("files"),
            None => return Ok(Vec::new()),
        };
        let mut files = Vec::new();
        for path in json_documents(&dir)? {
            if let Some(file) = read_json::<FileEntry>(&path)? {
                files.push(file);
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn file(&self, repo: &RepoId, id: &FileId) -> Result<Option<FileEntry>, Error> {
        match self.file_path(repo, id) {
            Some(path) => read_json(&path),
            None => Ok(None),
        }
    }

    fn put_file(&self, file: &FileEntry) -> Result<(), Error> {
        self.existing_repo_dir(&file.repo_id)?;
        let path = self
            .file_path(&file.repo_id, &file.id)
            .ok_or_else(|| NotFound::File(file.id.clone()))?;
        log::debug!("writing file {} ({}) to {:?}", file.id, file.name, path);
        write_json(file, &path)
    }

    fn delete_file(&self, repo: &RepoId, id: &FileId) -> Result<bool, Error> {
        let Some(path) = self.file_path(repo, id) else {
            return Ok(false);
        };
        match remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

impl CommitStore for DirectoryStorage {
    fn append_commit(&self, commit: &Commit) -> Result<(), Error> {
        let path = self.existing_repo_dir(&commit.repo_id)?.join("commits.json");
        let mut commits: Vec<Commit> = read_json(&path)?.unwrap_or_default();
        commits.push(commit.clone());
        log::debug!("appending commit {} to {:?}", commit.hash, path);
        write_json(&commits, &path)
    }

    fn commits(&self, repo: &RepoId) -> Result<Vec<Commit>, Error> {
        match self.repo_dir(repo) {
            Some(dir) => Ok(read_json(&dir.join("commits.json"))?.unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
use crate::commit::create_commit;

#[test]
fn test_directory_storage_round_trip() {
    let tempdir = tempfile::tempdir().unwrap();
    let storage = DirectoryStorage::new(tempdir.path().into()).unwrap();
    let repo = Repository::new("demo".into(), "a demo".into(), "main".into());
    storage.insert_repository(&repo).unwrap();
    assert_eq!(storage.repository(&repo.id).unwrap(), Some(repo.clone()));
    assert_eq!(storage.repositories().unwrap(), vec![repo.clone()]);

    let a = FileEntry::text(repo.id.clone(), "b.txt".into(), "y".into());
    let b = FileEntry::text(repo.id.clone(), "a.txt".into(), "x".into());
    storage.put_file(&a).unwrap();
    storage.put_file(&b).unwrap();
    let names: Vec<String> = storage
        .files(&repo.id)
        .unwrap()
        .into_iter()
        .map(|file| file.name)
        .collect();
    assert_eq!(names, ["a.txt", "b.txt"]);
    assert_eq!(storage.file_by_name(&repo.id, "b.txt").unwrap(), Some(a.clone()));

    let first = create_commit(&repo.id, "one", "me", &[a.clone(), b.clone()], None, Timestamp::now())
        .unwrap();
    storage.append_commit(&first).unwrap();
    let second = create_commit(
        &repo.id,
        "two",
        "me",
        &[a],
        Some(&first),
        Timestamp::now().strictly_after(first.created_at),
    )
    .unwrap();
    storage.append_commit(&second).unwrap();
    assert_eq!(storage.commits(&repo.id).unwrap(), vec![first.clone(), second.clone()]);
    assert_eq!(storage.latest_commit(&repo.id).unwrap(), Some(second));
    assert_eq!(storage.commit(&repo.id, &first.hash).unwrap(), Some(first));

    storage.record_change(&repo.id, 2, Timestamp::now()).unwrap();
    assert_eq!(storage.repository(&repo.id).unwrap().unwrap().file_count, 2);

    assert!(storage.delete_file(&repo.id, &b.id).unwrap());
    assert!(!storage.delete_file(&repo.id, &b.id).unwrap());

    assert!(storage.delete_repository(&repo.id).unwrap());
    assert!(!storage.delete_repository(&repo.id).unwrap());
    assert!(storage.repositories().unwrap().is_empty());
    assert!(storage.commits(&repo.id).unwrap().is_empty());
}

#[test]
fn test_ids_cannot_escape_root() {
    let tempdir = tempfile::tempdir().unwrap();
    let storage = DirectoryStorage::new(tempdir.path().join("store")).unwrap();
    assert_eq!(storage.repository(&RepoId::from("..")).unwrap(), None);
    assert_eq!(storage.repository(&RepoId::from("../x")).unwrap(), None);
    assert!(!storage.delete_repository(&RepoId::from("..")).unwrap());
    assert!(storage.files(&RepoId::from("a/b")).unwrap().is_empty());
}

#[test]
fn test_malformed_timestamp_surfaces_as_error() {
    let tempdir = tempfile::tempdir().unwrap();
    let storage = DirectoryStorage::new(tempdir.path().into()).unwrap();
    let repo = Repository::new("demo".into(), String::new(), "main".into());
    storage.insert_repository(&repo).unwrap();

    let path = tempdir
        .path()
        .join("repositories")
        .join(repo.id.as_str())
        .join("repository.json");
    let text = std::fs::read_to_string(&path).unwrap();
    let broken = text.replace(&repo.created_at.to_string(), "last tuesday");
    std::fs::write(&path, broken).unwrap();

    assert!(matches!(storage.repository(&repo.id), Err(Error::Serde(_))));
}

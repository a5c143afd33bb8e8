use std::{
    fs::{create_dir_all, File},
    io::{ErrorKind, Read, Write},
    path::PathBuf,
};

use crate::{hasher::hash_content, object_id::ObjectId};

use super::ObjectStore;

/// A persistent [`ObjectStore`] stored in a directory,
/// using the first two hexadecimal characters of the [`ObjectId`]
/// to determine which directory to place the binary object in
/// and creating a file with the rest of the hexadecimal characters
/// as the file name.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        if !root.try_exists()? {
            log::info!("creating directory store root: {:?}", root);
            create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    fn path(&self, id: ObjectId) -> (PathBuf, PathBuf) {
        let s: String = id.to_string();
        let subdir_path = self.root.join(&s[0..2]);
        let path = subdir_path.join(&s[2..]);
        (subdir_path, path)
    }
}

impl ObjectStore for DirectoryObjectStore {
    type Error = std::io::Error;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error> {
        log::debug!("checking whether {} is contained in {:?}", id, self.root);
        self.path(id).1.try_exists()
    }

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error> {
        log::debug!("reading {} from {:?}", id, self.root);
        match File::options().read(true).open(self.path(id).1) {
            Ok(mut f) => {
                let mut v = Vec::new();
                f.read_to_end(&mut v)?;
                Ok(Some(v))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn insert(&mut self, object: &[u8]) -> Result<ObjectId, Self::Error> {
        let id = hash_content(object);
        let (subdir_path, path) = self.path(id);
        if path.try_exists()? {
            log::debug!("{:?} already exists", path);
            return Ok(id);
        }
        log::info!("inserting {} into {:?}", id, self.root);
        create_dir_all(&subdir_path)?;
        // A reader never sees a half written object.
        let mut f = tempfile::NamedTempFile::new_in(&subdir_path)?;
        f.write_all(object)?;
        f.persist(&path).map_err(|err| err.error)?;
        Ok(id)
    }
}

#[test]
fn test_directory_object_store() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().join("objects")).unwrap();
    let id = store.insert(b"hello, world").unwrap();
    let b: &[u8] = b"hello, world";
    assert!(store.has(hash_content(b)).unwrap());
    assert_eq!(store.read(id).unwrap(), Some(Vec::from(b)));
    assert_eq!(store.insert(b).unwrap(), id);
    assert!(!store.has(hash_content(b"other")).unwrap());
    assert_eq!(store.read(hash_content(b"other")).unwrap(), None);

    let name = id.to_string();
    assert!(tempdir
        .path()
        .join("objects")
        .join(&name[..2])
        .join(&name[2..])
        .exists());
}

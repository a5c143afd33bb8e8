use std::{collections::BTreeMap, convert::Infallible};

use crate::{hasher::hash_content, object_id::ObjectId};

use super::ObjectStore;

#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStore {
    objects: BTreeMap<ObjectId, Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for InMemoryObjectStore {
    type Error = Infallible;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error> {
        Ok(self.objects.contains_key(&id))
    }

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.objects.get(&id).cloned())
    }

    fn insert(&mut self, object: &[u8]) -> Result<ObjectId, Self::Error> {
        let id = hash_content(object);
        self.objects.entry(id).or_insert_with(|| Vec::from(object));
        Ok(id)
    }
}

#[test]
fn test_in_memory_object_store() {
    let mut store = InMemoryObjectStore::new();
    let id = store.insert(b"hello, world").unwrap();
    let b: &[u8] = b"hello, world";
    assert_eq!(id, hash_content(b));
    assert!(store.has(id).unwrap());
    assert_eq!(store.read(id).unwrap(), Some(Vec::from(b)));
    assert_eq!(store.insert(b).unwrap(), id);
    assert_eq!(store.len(), 1);
    assert_eq!(store.read(hash_content(b"missing")).unwrap(), None);
}

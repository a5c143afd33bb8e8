use crate::object_id::ObjectId;

pub mod directory;
pub mod in_memory;

/// A content addressed store of file contents, keyed by the same
/// [`ObjectId`] that snapshots record for each file.
pub trait ObjectStore {
    type Error;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error>;

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Inserting the same bytes twice is a no-op returning the same id.
    fn insert(&mut self, object: &[u8]) -> Result<ObjectId, Self::Error>;
}

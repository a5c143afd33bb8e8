use std::convert::Infallible;

use derive_more::{Display, From};

use crate::{
    model::{FileId, RepoId},
    object_id::ObjectId,
};

#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    #[display(fmt = "io error: {}", _0)]
    IO(std::io::Error),
    /// Stored data (including stored timestamps) that does not parse.
    #[from]
    #[display(fmt = "malformed stored data: {}", _0)]
    Serde(serde_json::Error),
    #[from]
    #[display(fmt = "{}", _0)]
    NotFound(NotFound),
    #[display(fmt = "cannot commit an empty repository")]
    EmptyRepository,
    #[display(fmt = "content {} is not in the object store", _0)]
    ContentUnavailable(ObjectId),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(err) => Some(err),
            Error::Serde(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Infallible> for Error {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// The entity a lookup failed to find.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum NotFound {
    #[display(fmt = "repository {} not found", _0)]
    Repository(RepoId),
    #[display(fmt = "file {} not found", _0)]
    File(FileId),
    #[display(fmt = "file named {:?} not found", _0)]
    FileName(String),
    #[display(fmt = "commit {} not found", _0)]
    Commit(ObjectId),
}

#[test]
fn test_messages() {
    let err = Error::from(NotFound::Repository(RepoId::from("abc")));
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "repository abc not found");
    assert_eq!(
        Error::EmptyRepository.to_string(),
        "cannot commit an empty repository"
    );
}

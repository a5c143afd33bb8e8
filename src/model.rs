use std::fmt::Display;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// MIME type given to files created from text.
pub const TEXT_MIME: &str = "text/plain";
/// MIME type given to uploads that declare none.
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// Identifier of a [`Repository`].
#[derive(Debug, derive_more::Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(String);

/// Identifier of a [`FileEntry`], stable across updates to the same file.
#[derive(Debug, derive_more::Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

macro_rules! generated_id {
    ($name:ident) => {
        impl $name {
            pub fn generate() -> Self {
                $name(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }
    };
}

generated_id!(RepoId);
generated_id!(FileId);

/// A named container of files and the history of commits taken from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepoId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub default_branch: String,
    /// Cached number of files, kept in step with the file set.
    pub file_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Repository {
    pub fn new(name: String, description: String, default_branch: String) -> Self {
        let now = Timestamp::now();
        Repository {
            id: RepoId::generate(),
            name,
            description,
            default_branch,
            file_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// How a [`FileEntry`]'s `content` string relates to the original bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// The content is the file itself, as UTF-8.
    #[default]
    Text,
    /// The content is the standard base64 encoding of the file's bytes.
    Base64,
}

impl Encoding {
    pub fn is_binary(&self) -> bool {
        matches!(self, Encoding::Base64)
    }
}

/// A file in a repository's working set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: FileId,
    pub repo_id: RepoId,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub encoding: Encoding,
    /// Size of the original file in bytes.
    pub size: u64,
    pub mime_type: String,
    pub created_at: Timestamp,
}

impl FileEntry {
    pub fn text(repo_id: RepoId, name: String, content: String) -> Self {
        FileEntry {
            id: FileId::generate(),
            repo_id,
            name,
            size: content.len() as u64,
            content,
            encoding: Encoding::Text,
            mime_type: TEXT_MIME.to_owned(),
            created_at: Timestamp::now(),
        }
    }

    pub fn upload(repo_id: RepoId, name: String, upload: DecodedUpload) -> Self {
        FileEntry {
            id: FileId::generate(),
            repo_id,
            name,
            content: upload.content,
            encoding: upload.encoding,
            size: upload.size,
            mime_type: upload.mime_type,
            created_at: Timestamp::now(),
        }
    }

    /// Takes the identity of an existing file of the same name.
    pub fn replacing(mut self, existing: &FileEntry) -> Self {
        self.id = existing.id.clone();
        self
    }

    /// Replaces the text content in place, keeping identity.
    pub fn set_text(&mut self, content: String) {
        self.size = content.len() as u64;
        self.content = content;
        self.encoding = Encoding::Text;
        self.mime_type = TEXT_MIME.to_owned();
        self.created_at = Timestamp::now();
    }
}

/// Raw bytes that turned out not to be UTF-8 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingError {
    pub valid_up_to: usize,
}

impl Display for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid UTF-8 after byte {}", self.valid_up_to)
    }
}

impl std::error::Error for EncodingError {}

/// Uploaded bytes turned into the textual content model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedUpload {
    pub content: String,
    pub encoding: Encoding,
    pub size: u64,
    pub mime_type: String,
}

fn decode_text(bytes: Vec<u8>) -> Result<String, (EncodingError, Vec<u8>)> {
    String::from_utf8(bytes).map_err(|err| {
        let error = EncodingError {
            valid_up_to: err.utf8_error().valid_up_to(),
        };
        (error, err.into_bytes())
    })
}

/// Decodes uploaded bytes.
///
/// A declared non-`text/*` type is stored as base64. Anything else is decoded
/// as UTF-8 and falls back to base64 when it is not valid UTF-8.
pub fn decode_upload(bytes: Vec<u8>, content_type: Option<&str>) -> DecodedUpload {
    let size = bytes.len() as u64;
    let mime_type = content_type.unwrap_or(OCTET_STREAM_MIME).to_owned();
    let declared_binary = content_type.is_some_and(|ty| !ty.starts_with("text/"));

    let encode = |bytes: &[u8]| base64::engine::general_purpose::STANDARD.encode(bytes);
    let (content, encoding) = if declared_binary {
        (encode(&bytes), Encoding::Base64)
    } else {
        match decode_text(bytes) {
            Ok(text) => (text, Encoding::Text),
            Err((err, bytes)) => {
                log::warn!("upload is not text ({}), storing as base64", err);
                (encode(&bytes), Encoding::Base64)
            }
        }
    };

    DecodedUpload {
        content,
        encoding,
        size,
        mime_type,
    }
}

#[test]
fn test_text_upload_is_kept_as_text() {
    let upload = decode_upload(b"hello\nworld".to_vec(), Some("text/markdown"));
    assert_eq!(upload.content, "hello\nworld");
    assert_eq!(upload.encoding, Encoding::Text);
    assert_eq!(upload.size, 11);
    assert_eq!(upload.mime_type, "text/markdown");
}

#[test]
fn test_declared_binary_upload_is_base64() {
    let upload = decode_upload(b"abc".to_vec(), Some("image/png"));
    assert_eq!(upload.content, "YWJj");
    assert!(upload.encoding.is_binary());
    assert_eq!(upload.size, 3);
}

#[test]
fn test_invalid_utf8_falls_back_to_base64() {
    let upload = decode_upload(vec![0x66, 0xff, 0xfe], None);
    assert_eq!(upload.encoding, Encoding::Base64);
    assert_eq!(upload.content, "Zv/+");
    assert_eq!(upload.mime_type, OCTET_STREAM_MIME);
    assert_eq!(upload.size, 3);

    let err = decode_text(vec![0x66, 0xff]).unwrap_err().0;
    assert_eq!(err.valid_up_to, 1);
}

#[test]
fn test_replacing_keeps_identity() {
    let repo = RepoId::from("r");
    let old = FileEntry::text(repo.clone(), "a.txt".into(), "x".into());
    let new = FileEntry::text(repo, "a.txt".into(), "longer".into()).replacing(&old);
    assert_eq!(new.id, old.id);
    assert_eq!(new.size, 6);
}

#[test]
fn test_set_text_on_upload_becomes_plain_text() {
    let upload = decode_upload(vec![0x89, 0x50], Some("image/png"));
    let mut file = FileEntry::upload(RepoId::from("r"), "logo.png".into(), upload);
    let id = file.id.clone();
    file.set_text("now text".into());
    assert_eq!(file.id, id);
    assert_eq!(file.encoding, Encoding::Text);
    assert_eq!(file.mime_type, TEXT_MIME);
    assert_eq!(file.size, 8);
}

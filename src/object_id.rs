use crate::hex::{self, Hex, HexError};

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Number of bytes in an [`ObjectId`].
pub const OBJECT_ID_LEN: usize = 20;

/// An identifier for a particular piece of content or a commit.
/// Under the hood, this is the first 160 bits of a [`blake3`] hash.
///
/// It is displayed in hexadecimal format, always 40 characters long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    pub fn from_hasher(hasher: &blake3::Hasher) -> Self {
        let mut bytes = [0u8; OBJECT_ID_LEN];
        let mut reader = hasher.finalize_xof();
        reader.fill(&mut bytes);
        ObjectId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The abbreviated form used in human facing messages.
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(8);
        s
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Hex(&self.0))
    }
}

/// Why a string could not be read as an [`ObjectId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseObjectIdError {
    Hex(HexError),
    Length(usize),
}

impl Display for ParseObjectIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseObjectIdError::Hex(err) => write!(f, "invalid object id: {}", err),
            ParseObjectIdError::Length(n) => write!(
                f,
                "invalid object id: expected {} hex characters, got {}",
                OBJECT_ID_LEN * 2,
                n
            ),
        }
    }
}

impl std::error::Error for ParseObjectIdError {}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(ParseObjectIdError::Hex)?;
        let bytes: [u8; OBJECT_ID_LEN] = bytes
            .try_into()
            .map_err(|_| ParseObjectIdError::Length(s.len()))?;
        Ok(ObjectId(bytes))
    }
}

impl From<&[u8]> for ObjectId {
    fn from(bytes: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(bytes);
        ObjectId::from_hasher(&hasher)
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_display_is_forty_hex_characters() {
    let id = ObjectId::from(&b"hello, world"[..]);
    let s = id.to_string();
    assert_eq!(s.len(), 40);
    assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(s.parse::<ObjectId>().unwrap(), id);
    assert_eq!(id.short(), &s[..8]);
}

#[test]
fn test_is_a_blake3_prefix() {
    let full = blake3::hash(b"hello, world");
    let id = ObjectId::from(&b"hello, world"[..]);
    assert_eq!(id.as_bytes(), &full.as_bytes()[..OBJECT_ID_LEN]);
}

#[test]
fn test_parse_rejects_wrong_length() {
    assert_eq!(
        "abcd".parse::<ObjectId>(),
        Err(ParseObjectIdError::Length(4))
    );
    assert!("xyz0".parse::<ObjectId>().is_err());
}

#[test]
fn test_serde_as_hex_string() {
    let id = ObjectId::from(&b"x"[..]);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id));
    let back: ObjectId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
    assert!(serde_json::from_str::<ObjectId>("\"nothex\"").is_err());
}

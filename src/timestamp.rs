use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A UTC instant with microsecond precision.
///
/// The textual form is RFC 3339 with exactly six fractional digits and a `Z`
/// suffix. That form is what commit hashes are computed over, so a timestamp
/// read back from storage renders byte-identically to the one that was hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(Utc::now().trunc_subsecs(6))
    }

    /// This instant, or one microsecond after `earlier` if that is not
    /// strictly before it.
    pub fn strictly_after(self, earlier: Timestamp) -> Timestamp {
        if self > earlier {
            self
        } else {
            Timestamp(earlier.0 + chrono::Duration::microseconds(1))
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp(value.trunc_subsecs(6))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

/// A stored timestamp that is not valid RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampError {
    pub input: String,
    pub reason: String,
}

impl Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed timestamp {:?}: {}", self.input, self.reason)
    }
}

impl std::error::Error for TimestampError {}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Timestamp::from(dt.with_timezone(&Utc)))
            .map_err(|err| TimestampError {
                input: s.to_owned(),
                reason: err.to_string(),
            })
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_round_trips_through_text() {
    let now = Timestamp::now();
    let text = now.to_string();
    assert!(text.ends_with('Z'));
    assert_eq!(text.parse::<Timestamp>().unwrap(), now);
    assert_eq!(text.parse::<Timestamp>().unwrap().to_string(), text);
}

#[test]
fn test_accepts_offsets() {
    let ts: Timestamp = "2024-03-01T12:00:00+02:00".parse().unwrap();
    assert_eq!(ts.to_string(), "2024-03-01T10:00:00.000000Z");
}

#[test]
fn test_strictly_after() {
    let a: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
    let b: Timestamp = "2024-01-01T00:00:05Z".parse().unwrap();
    assert_eq!(b.strictly_after(a), b);
    assert_eq!(a.strictly_after(a).to_string(), "2024-01-01T00:00:00.000001Z");
    assert_eq!(a.strictly_after(b).to_string(), "2024-01-01T00:00:05.000001Z");
}

#[test]
fn test_malformed_timestamp_is_an_error() {
    let err = "yesterday".parse::<Timestamp>().unwrap_err();
    assert_eq!(err.input, "yesterday");
    assert!(serde_json::from_str::<Timestamp>("\"2024-13-45\"").is_err());
}

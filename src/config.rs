use std::{fs::File, io::ErrorKind, path::Path};

use serde::{Deserialize, Serialize};

use crate::{diff::DiffStrategy, error::Error};

/// Settings for a [`crate::vcs::Vcs`]. Missing fields take their defaults.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Branch name recorded on new repositories.
    pub default_branch: String,
    /// Author of commits that name none.
    pub default_author: String,
    /// How many commits a history listing returns when not told.
    pub history_limit: usize,
    pub diff_strategy: DiffStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_branch: String::from("main"),
            default_author: String::from("Anonymous"),
            history_limit: 50,
            diff_strategy: DiffStrategy::Membership,
        }
    }
}

impl Config {
    /// Reads a JSON config file, or the defaults if there is none.
    pub fn load(path: &Path) -> Result<Self, Error> {
        match File::options().read(true).open(path) {
            Ok(file) => {
                log::debug!("loading config from {:?}", path);
                Ok(serde_json::from_reader(file)?)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(err.into()),
        }
    }
}

#[test]
fn test_missing_file_gives_defaults() {
    let tempdir = tempfile::tempdir().unwrap();
    let config = Config::load(&tempdir.path().join("config.json")).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.history_limit, 50);
    assert_eq!(config.default_author, "Anonymous");
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let tempdir = tempfile::tempdir().unwrap();
    let path = tempdir.path().join("config.json");
    std::fs::write(&path, r#"{"history_limit": 5, "diff_strategy": "myers"}"#).unwrap();
    let config = Config::load(&path).unwrap();
    assert_eq!(config.history_limit, 5);
    assert_eq!(config.diff_strategy, DiffStrategy::Myers);
    assert_eq!(config.default_branch, "main");
}

#[test]
fn test_malformed_file_is_an_error() {
    let tempdir = tempfile::tempdir().unwrap();
    let path = tempdir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(Config::load(&path), Err(Error::Serde(_))));
}

//! Logical files stored in the remote repository.
//!
//! A [`RemoteFile`] is a category plus a name. The category decides which
//! remote folder the file lives in (see [`crate::paths`]), the name is an
//! opaque single path segment.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the sentinel file marking an initialized repository.
pub const REPO_FILE_NAME: &str = "syncany";

/// Name of the file holding the repository's master key salt.
pub const MASTER_FILE_NAME: &str = "master";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteFileType {
    Multichunk,
    Database,
    Cleanup,
    Action,
    Transaction,
    Temp,
    /// Files living directly in the repository root.
    Plain,
}

impl RemoteFileType {
    pub const ALL: [RemoteFileType; 7] = [
        RemoteFileType::Multichunk,
        RemoteFileType::Database,
        RemoteFileType::Cleanup,
        RemoteFileType::Action,
        RemoteFileType::Transaction,
        RemoteFileType::Temp,
        RemoteFileType::Plain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RemoteFileType::Multichunk => "multichunk",
            RemoteFileType::Database => "database",
            RemoteFileType::Cleanup => "cleanup",
            RemoteFileType::Action => "action",
            RemoteFileType::Transaction => "transaction",
            RemoteFileType::Temp => "temp",
            RemoteFileType::Plain => "plain",
        }
    }

    /// Prefix every file name of this category starts with, if any.
    pub fn name_prefix(self) -> Option<&'static str> {
        match self {
            RemoteFileType::Multichunk => Some("multichunk-"),
            RemoteFileType::Database => Some("db-"),
            RemoteFileType::Cleanup => Some("cleanup-"),
            RemoteFileType::Action => Some("action-"),
            RemoteFileType::Transaction => Some("transaction-"),
            RemoteFileType::Temp => Some("temp-"),
            RemoteFileType::Plain => None,
        }
    }

    /// Factory accepting only names that follow this category's pattern.
    pub fn factory(self) -> impl Fn(&str) -> Result<RemoteFile, InvalidRemoteFile> + Copy {
        move |name| RemoteFile::parse(self, name)
    }
}

impl fmt::Display for RemoteFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteFileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RemoteFileType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<_> = RemoteFileType::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown file type '{}', expected one of: {}", s, known.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRemoteFile {
    #[error("remote file name is empty")]
    Empty,

    #[error("remote file name {0:?} is not a single path segment")]
    NotASegment(String),

    #[error("remote file name {name:?} does not match the {file_type} pattern")]
    PatternMismatch {
        file_type: RemoteFileType,
        name: String,
    },
}

/// A file in the remote repository, identified by category and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteFile {
    file_type: RemoteFileType,
    name: String,
}

impl RemoteFile {
    /// Creates a remote file, checking only that `name` is a valid segment.
    pub fn new(file_type: RemoteFileType, name: impl Into<String>) -> Result<Self, InvalidRemoteFile> {
        let name = name.into();
        validate_segment(&name)?;
        Ok(Self { file_type, name })
    }

    /// Like [`RemoteFile::new`], but also requires the category's name prefix.
    pub fn parse(file_type: RemoteFileType, name: &str) -> Result<Self, InvalidRemoteFile> {
        validate_segment(name)?;
        if let Some(prefix) = file_type.name_prefix() {
            let rest = name.strip_prefix(prefix).unwrap_or_default();
            if rest.is_empty() {
                return Err(InvalidRemoteFile::PatternMismatch {
                    file_type,
                    name: name.to_string(),
                });
            }
        }
        Ok(Self {
            file_type,
            name: name.to_string(),
        })
    }

    /// The sentinel probed to decide whether a repository already exists.
    pub fn repo_file() -> Self {
        Self {
            file_type: RemoteFileType::Plain,
            name: REPO_FILE_NAME.to_string(),
        }
    }

    pub fn master_file() -> Self {
        Self {
            file_type: RemoteFileType::Plain,
            name: MASTER_FILE_NAME.to_string(),
        }
    }

    pub fn file_type(&self) -> RemoteFileType {
        self.file_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RemoteFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_type, self.name)
    }
}

fn validate_segment(name: &str) -> Result<(), InvalidRemoteFile> {
    if name.is_empty() {
        return Err(InvalidRemoteFile::Empty);
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(InvalidRemoteFile::NotASegment(name.to_string()));
    }
    Ok(())
}

/// Builds typed remote files from names found in a remote listing.
///
/// Any `Fn(&str) -> Result<T, InvalidRemoteFile>` is a factory, so callers
/// can pass [`RemoteFileType::factory`] or their own closure.
pub trait RemoteFileFactory {
    type Output: Eq + Hash;

    fn create_remote_file(&self, name: &str) -> Result<Self::Output, InvalidRemoteFile>;
}

impl<F, T> RemoteFileFactory for F
where
    F: Fn(&str) -> Result<T, InvalidRemoteFile>,
    T: Eq + Hash,
{
    type Output = T;

    fn create_remote_file(&self, name: &str) -> Result<T, InvalidRemoteFile> {
        self(name)
    }
}

use std::io;

use thiserror::Error;

use crate::remote_file::InvalidRemoteFile;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors surfaced by the transfer manager and its collaborators.
///
/// Transport errors never escape raw: they are wrapped into one of these
/// kinds, and every `Io`/`Rejected` failure raised by an operation has already
/// reset the session to disconnected.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The server answered, but refused the request.
    #[error("{0}")]
    Rejected(String),

    #[error("cannot connect after {attempts} attempts: {source}")]
    ConnectFailed {
        attempts: u32,
        #[source]
        source: Box<StorageError>,
    },

    #[error("remote file not found: {0}")]
    FileNotFound(String),

    #[error("cannot move {0}: source does not exist")]
    MoveFailed(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    InvalidRemoteFile(#[from] InvalidRemoteFile),

    #[error("config error: {0}")]
    Config(String),

    #[error("transfer task failed: {0}")]
    Task(String),
}

impl StorageError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound(_))
    }

    pub fn is_move_failed(&self) -> bool {
        matches!(self, Self::MoveFailed(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

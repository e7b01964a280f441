//! The storage contract consumed by the synchronization engine.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::remote_file::{RemoteFile, RemoteFileFactory, RemoteFileType};

/// Operations a remote storage backend offers to the synchronization engine.
///
/// Every operation connects on demand, so callers never manage the
/// connection. Implementations serve one caller at a time.
pub trait TransferManager {
    /// Connects and authenticates. A no-op when already connected.
    fn connect(&mut self) -> Result<()>;

    /// Closes the connection. Never fails.
    fn disconnect(&mut self);

    /// Creates the repository layout. The root folder itself is only created
    /// when `create_if_required` is set and `repo_file` does not exist yet.
    fn init(&mut self, create_if_required: bool, repo_file: &RemoteFile) -> Result<()>;

    fn upload(&mut self, local_file: &Path, remote_file: &RemoteFile) -> Result<()>;

    fn download(&mut self, remote_file: &RemoteFile, local_file: &Path) -> Result<()>;

    /// Returns whether `remote_file` is confirmed gone afterwards.
    fn delete(&mut self, remote_file: &RemoteFile) -> Result<bool>;

    fn move_file(&mut self, source: &RemoteFile, target: &RemoteFile) -> Result<()>;

    /// Files of one category. Names the factory rejects are skipped.
    fn list<F: RemoteFileFactory>(
        &mut self,
        file_type: RemoteFileType,
        factory: &F,
    ) -> Result<HashSet<F::Output>>;

    fn test_target_can_write(&mut self) -> bool;

    fn test_target_exists(&mut self) -> bool;

    fn test_target_can_create(&mut self) -> bool;

    fn test_repo_file_exists(&mut self, repo_file: &RemoteFile) -> bool;

    /// Runs every probe, as a setup wizard would before `init`.
    fn test(&mut self, test_create_target: bool) -> StorageTestResult {
        let mut result = StorageTestResult::default();

        if let Err(e) = self.connect() {
            info!(error = %e, "storage test: cannot connect to target");
            return result;
        }
        result.target_can_connect = true;

        result.target_exists = self.test_target_exists();
        result.target_can_write = result.target_exists && self.test_target_can_write();
        result.target_can_create = if test_create_target {
            self.test_target_can_create()
        } else {
            result.target_exists
        };
        result.repo_file_exists =
            result.target_exists && self.test_repo_file_exists(&RemoteFile::repo_file());

        info!(?result, "storage test finished");
        result
    }
}

/// Outcome of [`TransferManager::test`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageTestResult {
    pub target_can_connect: bool,
    pub target_exists: bool,
    pub target_can_create: bool,
    pub target_can_write: bool,
    pub repo_file_exists: bool,
}

impl StorageTestResult {
    /// Whether `init` can be run against this target.
    pub fn can_init(&self) -> bool {
        self.target_can_connect
            && !self.repo_file_exists
            && (self.target_can_write || self.target_can_create)
    }

    /// Whether the target already holds a repository to connect to.
    pub fn can_connect_to_repo(&self) -> bool {
        self.target_can_connect && self.target_exists && self.repo_file_exists
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_false() {
        let result = StorageTestResult::default();
        assert!(!result.target_can_connect);
        assert!(!result.can_init());
        assert!(!result.can_connect_to_repo());
    }

    #[test]
    fn test_empty_writable_folder_can_init() {
        let result = StorageTestResult {
            target_can_connect: true,
            target_exists: true,
            target_can_create: true,
            target_can_write: true,
            repo_file_exists: false,
        };
        assert!(result.can_init());
        assert!(!result.can_connect_to_repo());
    }

    #[test]
    fn test_existing_repo_cannot_init() {
        let result = StorageTestResult {
            target_can_connect: true,
            target_exists: true,
            target_can_create: true,
            target_can_write: true,
            repo_file_exists: true,
        };
        assert!(!result.can_init());
        assert!(result.can_connect_to_repo());
    }
}

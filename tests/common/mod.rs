#![allow(dead_code)]

use ftp_transfer::client::memory::{MemoryServer, MemorySession};
use ftp_transfer::{Cache, FtpTransferManager, FtpTransferSettings, LocalCache};
use rstest::*;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const USERNAME: &str = "syncany";
pub const PASSWORD: &str = "s3cret";

/// An in-memory FTP server plus local scratch space
pub struct TestRepo {
    pub server: MemoryServer,
    pub settings: FtpTransferSettings,
    pub local: TempDir,
    pub cache: TempDir,
}

impl TestRepo {
    pub fn with_path(path: &str) -> Self {
        Self {
            server: MemoryServer::new(USERNAME, PASSWORD),
            settings: FtpTransferSettings::new("ftp.test", USERNAME, PASSWORD, path),
            local: TempDir::new().unwrap(),
            cache: TempDir::new().unwrap(),
        }
    }

    pub fn manager(&self) -> FtpTransferManager<MemorySession> {
        self.manager_with(&self.settings)
    }

    pub fn manager_with(&self, settings: &FtpTransferSettings) -> FtpTransferManager<MemorySession> {
        let cache: Arc<dyn Cache> = Arc::new(LocalCache::new(self.cache.path()));
        FtpTransferManager::with_session(self.server.session(), settings, cache)
    }

    /// Writes a local file and returns its path
    pub fn local_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.local.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Files left behind in the download cache
    pub fn cached_files(&self) -> usize {
        std::fs::read_dir(self.cache.path()).unwrap().count()
    }
}

/// Fresh server, repository folder `/repo` not created yet
#[fixture]
pub fn repo() -> TestRepo {
    TestRepo::with_path("/repo")
}

/// Server with an initialized repository at `/repo`
#[fixture]
pub fn initialized_repo() -> TestRepo {
    use ftp_transfer::{RemoteFile, TransferManager};

    let repo = TestRepo::with_path("/repo");
    repo.manager().init(true, &RemoteFile::repo_file()).unwrap();
    repo
}

//! [`TransferManager`] storing a repository in an FTP folder.
//!
//! Repo and master files live directly in the configured folder; every other
//! category has its own subfolder (see [`RemotePaths`]). All operations
//! connect on demand. Connecting is retried once before giving up, and any
//! transport failure during an operation drops the connection so that the
//! next call starts from a fresh one.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cache::Cache;
use crate::client::ftp::SuppaFtpSession;
use crate::client::{FtpSession, Timeouts};
use crate::config::FtpTransferSettings;
use crate::error::{Result, StorageError};
use crate::paths::{self, RemotePaths};
use crate::remote_file::{RemoteFile, RemoteFileFactory, RemoteFileType};
use crate::retry;
use crate::transfer::TransferManager;

/// Connection attempts per `connect()` call.
pub const CONNECT_RETRY_COUNT: u32 = 2;

const WRITE_TEST_BYTES: [u8; 3] = [0x01, 0x02, 0x03];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

pub struct FtpTransferManager<S: FtpSession = SuppaFtpSession> {
    session: S,
    state: SessionState,
    hostname: String,
    port: u16,
    username: String,
    password: String,
    paths: RemotePaths,
    timeouts: Timeouts,
    cache: Arc<dyn Cache>,
}

impl FtpTransferManager<SuppaFtpSession> {
    pub fn new(settings: &FtpTransferSettings, cache: Arc<dyn Cache>) -> Self {
        Self::with_session(SuppaFtpSession::new(), settings, cache)
    }
}

impl<S: FtpSession> FtpTransferManager<S> {
    /// Manager driving an arbitrary session implementation.
    pub fn with_session(session: S, settings: &FtpTransferSettings, cache: Arc<dyn Cache>) -> Self {
        Self {
            session,
            state: SessionState::Disconnected,
            hostname: settings.hostname.clone(),
            port: settings.port,
            username: settings.username.clone(),
            password: settings.password.clone(),
            paths: RemotePaths::new(&settings.path),
            timeouts: Timeouts::default(),
            cache,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn paths(&self) -> &RemotePaths {
        &self.paths
    }

    /// Remote path a file is stored at.
    pub fn remote_path(&self, remote_file: &RemoteFile) -> String {
        self.paths.file_path(remote_file)
    }

    fn connect_once(&mut self) -> Result<()> {
        let target = format!("{}:{}", self.hostname, self.port);

        self.session
            .connect(&self.hostname, self.port, &self.timeouts)
            .map_err(|e| StorageError::io(format!("cannot connect to {}", target), e))?;

        let logged_in = self
            .session
            .login(&self.username, &self.password)
            .map_err(|e| StorageError::io(format!("cannot log in to {}", target), e))?;
        if !logged_in {
            return Err(StorageError::Rejected(format!(
                "invalid FTP login credentials for {}@{}",
                self.username, target
            )));
        }

        self.session
            .enter_passive_mode()
            .map_err(|e| StorageError::io("cannot enter passive mode", e))?;

        let binary = self
            .session
            .set_binary_mode()
            .map_err(|e| StorageError::io("cannot select binary transfer mode", e))?;
        if !binary {
            return Err(StorageError::Rejected(
                "server refused binary transfer mode".to_string(),
            ));
        }

        Ok(())
    }

    /// Resets the session after a failure so the next call reconnects.
    fn force_disconnect(&mut self) {
        if let Err(e) = self.session.disconnect() {
            debug!(error = %e, "FTP: ignoring error while force-disconnecting");
        }
        self.state = SessionState::Disconnected;
    }

    /// Drops the connection and wraps a transport error.
    fn io_failure(&mut self, context: String, source: io::Error) -> StorageError {
        self.force_disconnect();
        let err = StorageError::io(context, source);
        error!(error = %err, "FTP operation failed");
        err
    }

    /// Drops the connection and passes on a refusal.
    fn rejected(&mut self, message: String) -> StorageError {
        self.force_disconnect();
        error!(error = %message, "FTP operation failed");
        StorageError::Rejected(message)
    }

    /// Creates `path`, accepting a refusal when the folder already exists.
    fn ensure_directory(&mut self, path: &str) -> Result<()> {
        match self.session.make_directory(path) {
            Ok(true) => {
                info!(path, "FTP: created directory");
                Ok(())
            }
            Ok(false) => match self.session.change_directory(path) {
                Ok(true) => {
                    debug!(path, "FTP: directory already exists");
                    Ok(())
                }
                Ok(false) => Err(self.rejected(format!("cannot create directory {}", path))),
                Err(e) => Err(self.io_failure(format!("cannot create directory {}", path), e)),
            },
            Err(e) => Err(self.io_failure(format!("cannot create directory {}", path), e)),
        }
    }

    /// Connects for a probe, reporting failure instead of raising it.
    fn probe_connect(&mut self, probe: &str) -> bool {
        match self.connect() {
            Ok(()) => true,
            Err(e) => {
                info!(probe, error = %e, "cannot connect to target");
                false
            }
        }
    }
}

impl<S: FtpSession> TransferManager for FtpTransferManager<S> {
    fn connect(&mut self) -> Result<()> {
        if self.state == SessionState::Connected && self.session.is_connected() {
            debug!("FTP client already connected, skipping connect");
            return Ok(());
        }

        info!(host = %self.hostname, port = self.port, "FTP client connecting");

        let result = retry::with_retries("FTP connect", CONNECT_RETRY_COUNT, |attempt| {
            debug!(attempt, "FTP connect attempt");
            self.connect_once().map_err(|e| {
                let _ = self.session.disconnect();
                e
            })
        });

        match result {
            Ok(()) => {
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(StorageError::ConnectFailed {
                    attempts: CONNECT_RETRY_COUNT,
                    source: Box::new(e),
                })
            }
        }
    }

    fn disconnect(&mut self) {
        if let Err(e) = self.session.disconnect() {
            debug!(error = %e, "FTP: ignoring error while disconnecting");
        }
        self.state = SessionState::Disconnected;
    }

    fn init(&mut self, create_if_required: bool, repo_file: &RemoteFile) -> Result<()> {
        self.connect()?;

        if create_if_required && !self.test_repo_file_exists(repo_file) {
            let repo = self.paths.repo().to_string();
            self.ensure_directory(&repo)?;
        }

        let dirs: Vec<String> = self
            .paths
            .subdirectories()
            .iter()
            .map(|dir| dir.to_string())
            .collect();
        for dir in &dirs {
            self.ensure_directory(dir)?;
        }

        Ok(())
    }

    fn download(&mut self, remote_file: &RemoteFile, local_file: &Path) -> Result<()> {
        self.connect()?;

        let remote_path = self.paths.file_path(remote_file);
        let name_hint = local_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| remote_file.name().to_string());

        let temp_file = match self.cache.create_temp_file(&name_hint) {
            Ok(path) => path,
            Err(e) => {
                return Err(self.io_failure(
                    format!("cannot create temp file to download {}", remote_path),
                    e,
                ))
            }
        };

        info!(remote = %remote_path, temp = %temp_file.display(), "FTP: downloading to temp file");

        match self.session.retrieve(&remote_path, &temp_file) {
            Ok(true) => {}
            Ok(false) => {
                discard_temp(&temp_file);
                info!(remote = %remote_path, "FTP: remote file does not exist");
                return Err(StorageError::FileNotFound(remote_path));
            }
            Err(e) => {
                discard_temp(&temp_file);
                return Err(self.io_failure(format!("cannot download {}", remote_path), e));
            }
        }

        info!(temp = %temp_file.display(), local = %local_file.display(), "FTP: moving temp file into place");

        if let Err(e) = move_into_place(&temp_file, local_file) {
            discard_temp(&temp_file);
            return Err(self.io_failure(
                format!("cannot store {} at {}", remote_path, local_file.display()),
                e,
            ));
        }

        Ok(())
    }

    fn upload(&mut self, local_file: &Path, remote_file: &RemoteFile) -> Result<()> {
        self.connect()?;

        let remote_path = self.paths.file_path(remote_file);
        let temp_path = self.paths.upload_temp_path(remote_file.name());

        info!(local = %local_file.display(), temp = %temp_path, "FTP: uploading to temp file");

        match self.session.store(&temp_path, local_file) {
            Ok(true) => {}
            Ok(false) => {
                return Err(self.rejected(format!("cannot upload {} to {}", remote_file.name(), temp_path)))
            }
            Err(e) => {
                return Err(self.io_failure(format!("cannot upload {} to {}", remote_file.name(), temp_path), e))
            }
        }

        info!(temp = %temp_path, remote = %remote_path, "FTP: renaming temp file");

        match self.session.rename(&temp_path, &remote_path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(self.rejected(format!("cannot rename {} to {}", temp_path, remote_path))),
            Err(e) => Err(self.io_failure(format!("cannot rename {} to {}", temp_path, remote_path), e)),
        }
    }

    fn delete(&mut self, remote_file: &RemoteFile) -> Result<bool> {
        self.connect()?;

        let remote_path = self.paths.file_path(remote_file);
        info!(remote = %remote_path, "FTP: deleting file");

        match self.session.delete(&remote_path) {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) => return Err(self.io_failure(format!("cannot delete {}", remote_path), e)),
        }

        // Servers refuse DELE for missing files; look before reporting failure.
        match self.session.name_list(&remote_path) {
            Ok(Some(names)) => {
                let gone = names.is_empty();
                warn!(remote = %remote_path, gone, "FTP: delete refused, checked listing");
                Ok(gone)
            }
            Ok(None) => {
                warn!(remote = %remote_path, "FTP: delete refused and path not listable");
                Ok(false)
            }
            Err(e) => Err(self.io_failure(format!("cannot delete {}", remote_path), e)),
        }
    }

    fn move_file(&mut self, source: &RemoteFile, target: &RemoteFile) -> Result<()> {
        self.connect()?;

        let source_path = self.paths.file_path(source);
        let target_path = self.paths.file_path(target);
        info!(source = %source_path, target = %target_path, "FTP: renaming");

        match self.session.rename(&source_path, &target_path) {
            Ok(true) => Ok(()),
            Ok(false) => {
                info!(source = %source_path, "FTP: source file does not exist");
                Err(StorageError::MoveFailed(source_path))
            }
            Err(e) => Err(self.io_failure(
                format!("cannot rename {} to {}", source_path, target_path),
                e,
            )),
        }
    }

    fn list<F: RemoteFileFactory>(
        &mut self,
        file_type: RemoteFileType,
        factory: &F,
    ) -> Result<HashSet<F::Output>> {
        self.connect()?;

        let dir = self.paths.dir_for(file_type).to_string();
        let entries = match self.session.list(&format!("{}/", dir.trim_end_matches('/'))) {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                debug!(dir = %dir, "FTP: directory not listable, treating as empty");
                Vec::new()
            }
            Err(e) => return Err(self.io_failure(format!("cannot list {}", dir), e)),
        };

        let mut files = HashSet::new();
        for entry in entries.iter().filter(|entry| entry.is_file()) {
            match factory.create_remote_file(&entry.name) {
                Ok(file) => {
                    files.insert(file);
                }
                Err(e) => debug!(
                    %file_type,
                    name = %entry.name,
                    error = %e,
                    "ignoring file with unexpected name"
                ),
            }
        }

        Ok(files)
    }

    fn test_target_can_write(&mut self) -> bool {
        if !self.probe_connect("test_target_can_write") {
            return false;
        }

        let repo = self.paths.repo().to_string();
        let test_path = self.paths.write_test_path();

        let sample = match self.cache.create_temp_file(paths::WRITE_TEST_FILE).and_then(|path| {
            fs::write(&path, WRITE_TEST_BYTES)?;
            Ok(path)
        }) {
            Ok(path) => path,
            Err(e) => {
                info!(error = %e, "test_target_can_write: cannot stage test file");
                return false;
            }
        };

        let result = self.session.change_directory(&repo).and_then(|exists| {
            if !exists {
                return Ok(false);
            }
            let stored = self.session.store(&test_path, &sample)?;
            if stored {
                self.session.delete(&test_path)?;
            }
            Ok(stored)
        });
        discard_temp(&sample);

        match result {
            Ok(true) => {
                info!("test_target_can_write: can write, test file created and deleted");
                true
            }
            Ok(false) => {
                info!("test_target_can_write: cannot write, target missing or not writable");
                false
            }
            Err(e) => {
                self.force_disconnect();
                info!(error = %e, "test_target_can_write: cannot write to target");
                false
            }
        }
    }

    fn test_target_exists(&mut self) -> bool {
        if !self.probe_connect("test_target_exists") {
            return false;
        }

        let repo = self.paths.repo().to_string();
        match self.session.change_directory(&repo) {
            Ok(true) => {
                info!(repo = %repo, "test_target_exists: target exists");
                true
            }
            Ok(false) => {
                info!(repo = %repo, "test_target_exists: target does not exist");
                false
            }
            Err(e) => {
                self.force_disconnect();
                info!(repo = %repo, error = %e, "test_target_exists: cannot change into target");
                false
            }
        }
    }

    fn test_target_can_create(&mut self) -> bool {
        if self.test_target_exists() {
            info!("test_target_can_create: target already exists");
            return true;
        }
        if !self.probe_connect("test_target_can_create") {
            return false;
        }

        let repo = self.paths.repo().to_string();
        let result = self.session.make_directory(&repo).and_then(|created| {
            if created {
                self.session.remove_directory(&repo)?;
            }
            Ok(created)
        });

        match result {
            Ok(true) => {
                info!(repo = %repo, "test_target_can_create: target can be created");
                true
            }
            Ok(false) => {
                info!(repo = %repo, "test_target_can_create: test creation refused");
                false
            }
            Err(e) => {
                self.force_disconnect();
                info!(repo = %repo, error = %e, "test_target_can_create: target cannot be created");
                false
            }
        }
    }

    fn test_repo_file_exists(&mut self, repo_file: &RemoteFile) -> bool {
        if !self.probe_connect("test_repo_file_exists") {
            return false;
        }

        let repo_file_path = self.paths.file_path(repo_file);
        let parent = paths::parent(&repo_file_path).to_string();

        match self.session.list(&parent) {
            Ok(Some(entries)) => {
                let exists = entries.iter().any(|entry| entry.name == repo_file.name());
                info!(path = %repo_file_path, exists, "test_repo_file_exists: listed parent");
                exists
            }
            Ok(None) => {
                info!(path = %repo_file_path, "test_repo_file_exists: parent cannot be listed");
                false
            }
            Err(e) => {
                self.force_disconnect();
                info!(path = %repo_file_path, error = %e, "test_repo_file_exists: listing failed");
                false
            }
        }
    }
}

impl<S: FtpSession> Drop for FtpTransferManager<S> {
    fn drop(&mut self) {
        if self.state == SessionState::Connected {
            let _ = self.session.disconnect();
        }
    }
}

/// Moves a downloaded `temp` file over `dest`.
fn move_into_place(temp: &Path, dest: &Path) -> io::Result<()> {
    match fs::remove_file(dest) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    if fs::rename(temp, dest).is_err() {
        // Cache and destination may be on different filesystems.
        fs::copy(temp, dest)?;
        fs::remove_file(temp)?;
    }
    Ok(())
}

fn discard_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "cannot remove temp file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalCache;
    use crate::client::RemoteEntry;
    use mockall::mock;
    use tempfile::TempDir;

    mock! {
        Session {}

        impl FtpSession for Session {
            fn is_connected(&self) -> bool;
            fn connect(&mut self, host: &str, port: u16, timeouts: &Timeouts) -> io::Result<()>;
            fn login(&mut self, username: &str, password: &str) -> io::Result<bool>;
            fn enter_passive_mode(&mut self) -> io::Result<()>;
            fn set_binary_mode(&mut self) -> io::Result<bool>;
            fn store(&mut self, path: &str, local: &Path) -> io::Result<bool>;
            fn retrieve(&mut self, path: &str, local: &Path) -> io::Result<bool>;
            fn rename(&mut self, from: &str, to: &str) -> io::Result<bool>;
            fn delete(&mut self, path: &str) -> io::Result<bool>;
            fn list(&mut self, path: &str) -> io::Result<Option<Vec<RemoteEntry>>>;
            fn name_list(&mut self, path: &str) -> io::Result<Option<Vec<String>>>;
            fn make_directory(&mut self, path: &str) -> io::Result<bool>;
            fn remove_directory(&mut self, path: &str) -> io::Result<bool>;
            fn change_directory(&mut self, path: &str) -> io::Result<bool>;
            fn disconnect(&mut self) -> io::Result<()>;
        }
    }

    fn settings() -> FtpTransferSettings {
        FtpTransferSettings {
            hostname: "ftp.example.com".to_string(),
            username: "alice".to_string(),
            password: "secret".to_string(),
            path: "repo".to_string(),
            port: 2121,
        }
    }

    fn manager(session: MockSession) -> (FtpTransferManager<MockSession>, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache: Arc<dyn Cache> = Arc::new(LocalCache::new(dir.path()));
        (FtpTransferManager::with_session(session, &settings(), cache), dir)
    }

    /// Session whose handshake always succeeds after `connect`.
    fn accepting_session() -> MockSession {
        let mut session = MockSession::new();
        session.expect_login().returning(|_, _| Ok(true));
        session.expect_enter_passive_mode().returning(|| Ok(()));
        session.expect_set_binary_mode().returning(|| Ok(true));
        session.expect_disconnect().returning(|| Ok(()));
        session
    }

    fn refused() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")
    }

    #[test]
    fn test_connect_is_idempotent() {
        let mut session = accepting_session();
        session
            .expect_connect()
            .withf(|host, port, _| host == "ftp.example.com" && *port == 2121)
            .times(1)
            .returning(|_, _, _| Ok(()));
        session.expect_is_connected().returning(|| true);

        let (mut manager, _dir) = manager(session);
        manager.connect().unwrap();
        manager.connect().unwrap();

        assert_eq!(manager.state(), SessionState::Connected);
    }

    #[test]
    fn test_connect_retries_once() {
        let mut session = accepting_session();
        let mut calls = 0;
        session.expect_connect().times(2).returning(move |_, _, _| {
            calls += 1;
            if calls == 1 {
                Err(refused())
            } else {
                Ok(())
            }
        });

        let (mut manager, _dir) = manager(session);
        manager.connect().unwrap();

        assert_eq!(manager.state(), SessionState::Connected);
    }

    #[test]
    fn test_connect_gives_up_after_two_attempts() {
        let mut session = accepting_session();
        session
            .expect_connect()
            .times(2)
            .returning(|_, _, _| Err(refused()));

        let (mut manager, _dir) = manager(session);
        let err = manager.connect().unwrap_err();

        assert!(matches!(err, StorageError::ConnectFailed { attempts: 2, .. }));
        assert_eq!(manager.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_bad_credentials_fail_connect() {
        let mut session = MockSession::new();
        session.expect_connect().times(2).returning(|_, _, _| Ok(()));
        session.expect_login().times(2).returning(|_, _| Ok(false));
        session.expect_disconnect().returning(|| Ok(()));

        let (mut manager, _dir) = manager(session);
        let err = manager.connect().unwrap_err();

        match err {
            StorageError::ConnectFailed { source, .. } => {
                assert!(matches!(*source, StorageError::Rejected(_)))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_upload_renames_temp_file() {
        let mut session = accepting_session();
        session.expect_connect().returning(|_, _, _| Ok(()));
        session
            .expect_store()
            .withf(|path, local| {
                path == "/repo/temp-multichunk-1" && fs::read(local).unwrap() == b"chunk"
            })
            .times(1)
            .returning(|_, _| Ok(true));
        session
            .expect_rename()
            .withf(|from, to| from == "/repo/temp-multichunk-1" && to == "/repo/multichunks/multichunk-1")
            .times(1)
            .returning(|_, _| Ok(true));

        let (mut manager, dir) = manager(session);
        let local = dir.path().join("chunk");
        fs::write(&local, b"chunk").unwrap();

        let file = RemoteFile::new(RemoteFileType::Multichunk, "multichunk-1").unwrap();
        manager.upload(&local, &file).unwrap();
    }

    #[test]
    fn test_refused_rename_fails_upload_and_disconnects() {
        let mut session = accepting_session();
        session.expect_connect().returning(|_, _, _| Ok(()));
        session.expect_store().returning(|_, _| Ok(true));
        session.expect_rename().returning(|_, _| Ok(false));

        let (mut manager, dir) = manager(session);
        let local = dir.path().join("chunk");
        fs::write(&local, b"chunk").unwrap();

        let file = RemoteFile::new(RemoteFileType::Multichunk, "multichunk-1").unwrap();
        let err = manager.upload(&local, &file).unwrap_err();

        assert!(matches!(err, StorageError::Rejected(_)));
        assert_eq!(manager.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_delete_falls_back_to_listing() {
        let mut session = accepting_session();
        session.expect_connect().returning(|_, _, _| Ok(()));
        session.expect_is_connected().returning(|| true);
        session.expect_delete().returning(|_| Ok(false));
        session
            .expect_name_list()
            .withf(|path| path == "/repo/databases/db-A-1")
            .times(1)
            .returning(|_| Ok(Some(Vec::new())));

        let (mut manager, _dir) = manager(session);
        let file = RemoteFile::new(RemoteFileType::Database, "db-A-1").unwrap();

        assert!(manager.delete(&file).unwrap());
    }

    #[test]
    fn test_delete_reports_file_still_present() {
        let mut session = accepting_session();
        session.expect_connect().returning(|_, _, _| Ok(()));
        session.expect_delete().returning(|_| Ok(false));
        session
            .expect_name_list()
            .returning(|path| Ok(Some(vec![path.to_string()])));

        let (mut manager, _dir) = manager(session);
        let file = RemoteFile::new(RemoteFileType::Database, "db-A-1").unwrap();

        assert!(!manager.delete(&file).unwrap());
    }

    #[test]
    fn test_delete_refused_without_listing_fails() {
        let mut session = accepting_session();
        session.expect_connect().returning(|_, _, _| Ok(()));
        session.expect_is_connected().returning(|| true);
        session.expect_delete().times(1).returning(|_| Ok(false));
        session.expect_name_list().times(1).returning(|_| Ok(None));

        let (mut manager, _dir) = manager(session);
        let file = RemoteFile::new(RemoteFileType::Database, "db-A-1").unwrap();

        assert!(!manager.delete(&file).unwrap());
        assert_eq!(manager.state(), SessionState::Connected);
    }

    #[test]
    fn test_download_streams_into_cache_then_moves() {
        let mut session = accepting_session();
        session.expect_connect().returning(|_, _, _| Ok(()));
        session
            .expect_retrieve()
            .withf(|path, _| path == "/repo/databases/db-A-1")
            .times(1)
            .returning(|_, local| {
                fs::write(local, b"database").unwrap();
                Ok(true)
            });

        let (mut manager, dir) = manager(session);
        let dest = dir.path().join("restored");
        fs::write(&dest, b"stale").unwrap();

        let file = RemoteFile::new(RemoteFileType::Database, "db-A-1").unwrap();
        manager.download(&file, &dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"database");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path() != dest)
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_download_of_missing_file_keeps_connection() {
        let mut session = accepting_session();
        session.expect_connect().returning(|_, _, _| Ok(()));
        session.expect_retrieve().returning(|_, _| Ok(false));

        let (mut manager, dir) = manager(session);
        let file = RemoteFile::new(RemoteFileType::Database, "db-A-1").unwrap();
        let err = manager.download(&file, &dir.path().join("restored")).unwrap_err();

        assert!(matches!(err, StorageError::FileNotFound(_)));
        assert_eq!(manager.state(), SessionState::Connected);
    }

    #[test]
    fn test_init_accepts_existing_directories() {
        let mut session = accepting_session();
        session.expect_connect().returning(|_, _, _| Ok(()));
        session.expect_is_connected().returning(|| true);
        session.expect_make_directory().times(5).returning(|_| Ok(false));
        session.expect_change_directory().times(5).returning(|_| Ok(true));

        let (mut manager, _dir) = manager(session);
        manager.init(false, &RemoteFile::repo_file()).unwrap();
    }

    #[test]
    fn test_init_fails_when_directory_cannot_be_created() {
        let mut session = accepting_session();
        session.expect_connect().returning(|_, _, _| Ok(()));
        session.expect_is_connected().returning(|| true);
        session.expect_make_directory().times(1).returning(|_| Ok(false));
        session.expect_change_directory().times(1).returning(|_| Ok(false));

        let (mut manager, _dir) = manager(session);
        let err = manager.init(false, &RemoteFile::repo_file()).unwrap_err();

        assert!(matches!(err, StorageError::Rejected(_)));
        assert_eq!(manager.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_target_check_swallows_transport_error() {
        let mut session = accepting_session();
        session.expect_connect().returning(|_, _, _| Ok(()));
        session
            .expect_change_directory()
            .returning(|_| Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")));

        let (mut manager, _dir) = manager(session);

        assert!(!manager.test_target_exists());
        assert_eq!(manager.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_move_into_place_overwrites_destination() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("temp");
        let dest = dir.path().join("dest");
        fs::write(&temp, b"new").unwrap();
        fs::write(&dest, b"old contents").unwrap();

        move_into_place(&temp, &dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
        assert!(!temp.exists());
    }
}

pub mod ftp;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

use std::io;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub size: u64,
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            kind: EntryKind::Directory,
        }
    }

    /// Regular file; directories and links are not.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Socket timeouts applied before a connection is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub data: Duration,
    pub default: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(5000),
            data: Duration::from_millis(5000),
            default: Duration::from_millis(5000),
        }
    }
}

/// Blocking FTP command channel used by the transfer manager.
///
/// Methods mirror single FTP commands. `Err` means the transport failed
/// (socket error, timeout, garbled reply). A negative server reply is not an
/// error: it is reported as `Ok(false)` or `Ok(None)`.
pub trait FtpSession {
    fn is_connected(&self) -> bool;

    fn connect(&mut self, host: &str, port: u16, timeouts: &Timeouts) -> io::Result<()>;

    /// USER/PASS. `Ok(false)` when the credentials are refused.
    fn login(&mut self, username: &str, password: &str) -> io::Result<bool>;

    fn enter_passive_mode(&mut self) -> io::Result<()>;

    /// TYPE I.
    fn set_binary_mode(&mut self) -> io::Result<bool>;

    /// STOR, streaming the contents of `local`.
    fn store(&mut self, path: &str, local: &Path) -> io::Result<bool>;

    /// RETR, streaming into `local`. `Ok(false)` when the server has no
    /// such file.
    fn retrieve(&mut self, path: &str, local: &Path) -> io::Result<bool>;

    /// RNFR + RNTO.
    fn rename(&mut self, from: &str, to: &str) -> io::Result<bool>;

    /// DELE.
    fn delete(&mut self, path: &str) -> io::Result<bool>;

    /// LIST. `Ok(None)` when the server refuses to list `path`.
    fn list(&mut self, path: &str) -> io::Result<Option<Vec<RemoteEntry>>>;

    /// NLST. `Ok(None)` when the server refuses to list `path`.
    fn name_list(&mut self, path: &str) -> io::Result<Option<Vec<String>>>;

    /// MKD.
    fn make_directory(&mut self, path: &str) -> io::Result<bool>;

    /// RMD.
    fn remove_directory(&mut self, path: &str) -> io::Result<bool>;

    /// CWD.
    fn change_directory(&mut self, path: &str) -> io::Result<bool>;

    /// QUIT and close. The session is closed even when this fails.
    fn disconnect(&mut self) -> io::Result<()>;
}

/// Error for operations attempted on a closed session.
pub(crate) fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "FTP session is not connected")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.connect, Duration::from_secs(5));
        assert_eq!(timeouts.data, Duration::from_secs(5));
        assert_eq!(timeouts.default, Duration::from_secs(5));
    }

    #[test]
    fn test_entry_kind() {
        let file = RemoteEntry::file("db-A-1", 12);
        let dir = RemoteEntry::directory("databases");
        let link = RemoteEntry {
            name: "latest".to_string(),
            size: 7,
            kind: EntryKind::Symlink,
        };

        assert!(file.is_file());
        assert!(!file.is_dir());
        assert!(!dir.is_file());
        assert!(dir.is_dir());
        assert!(!link.is_file());
        assert!(!link.is_dir());
    }
}

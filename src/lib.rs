#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! FTP storage backend for a file-synchronization client.
//!
//! [`FtpTransferManager`] implements the [`TransferManager`] contract on top of
//! an [`FtpSession`](client::FtpSession): a repository folder on an FTP server
//! with one subfolder per file category.

pub mod cache;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod paths;
pub mod plugin;
pub mod remote_file;
pub mod retry;
pub mod transfer;

pub use cache::{Cache, LocalCache};
pub use config::FtpTransferSettings;
pub use connection::AsyncTransferManager;
pub use error::{Result, StorageError};
pub use manager::{FtpTransferManager, SessionState};
pub use plugin::FtpTransferPlugin;
pub use remote_file::{RemoteFile, RemoteFileFactory, RemoteFileType};
pub use transfer::{StorageTestResult, TransferManager};

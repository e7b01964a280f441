//! Maps logical file categories onto the remote folder layout.

use crate::remote_file::{RemoteFile, RemoteFileType};

pub const MULTICHUNKS_DIR: &str = "multichunks";
pub const DATABASES_DIR: &str = "databases";
pub const ACTIONS_DIR: &str = "actions";
pub const TRANSACTIONS_DIR: &str = "transactions";
pub const TEMPORARY_DIR: &str = "temporary";

/// Name of the marker file written by the write probe.
pub const WRITE_TEST_FILE: &str = "syncany-write-test";

/// Absolute remote paths of a repository rooted at some FTP directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePaths {
    repo: String,
    multichunks: String,
    databases: String,
    actions: String,
    transactions: String,
    temporary: String,
}

impl RemotePaths {
    pub fn new(root: &str) -> Self {
        let repo = normalize_root(root);
        let child = |dir: &str| format!("{}/{}", repo.trim_end_matches('/'), dir);

        Self {
            multichunks: child(MULTICHUNKS_DIR),
            databases: child(DATABASES_DIR),
            actions: child(ACTIONS_DIR),
            transactions: child(TRANSACTIONS_DIR),
            temporary: child(TEMPORARY_DIR),
            repo,
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Folder holding files of the given category.
    pub fn dir_for(&self, file_type: RemoteFileType) -> &str {
        match file_type {
            RemoteFileType::Multichunk => &self.multichunks,
            RemoteFileType::Database | RemoteFileType::Cleanup => &self.databases,
            RemoteFileType::Action => &self.actions,
            RemoteFileType::Transaction => &self.transactions,
            RemoteFileType::Temp => &self.temporary,
            RemoteFileType::Plain => &self.repo,
        }
    }

    pub fn file_path(&self, file: &RemoteFile) -> String {
        join(self.dir_for(file.file_type()), file.name())
    }

    /// Staging path an upload of `name` is written to before the final rename.
    pub fn upload_temp_path(&self, name: &str) -> String {
        join(&self.repo, &format!("temp-{}", name))
    }

    pub fn write_test_path(&self) -> String {
        join(&self.repo, WRITE_TEST_FILE)
    }

    /// The fixed subfolders created by `init`, in creation order.
    pub fn subdirectories(&self) -> [&str; 5] {
        [
            self.multichunks.as_str(),
            self.databases.as_str(),
            self.actions.as_str(),
            self.transactions.as_str(),
            self.temporary.as_str(),
        ]
    }
}

/// Parent folder of a remote path, `""` if it has none.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

fn normalize_root(root: &str) -> String {
    let trimmed = root.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

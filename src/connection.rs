//! Async access to a blocking [`TransferManager`] from a tokio runtime.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Result;
use crate::remote_file::{RemoteFile, RemoteFileFactory, RemoteFileType};
use crate::transfer::{StorageTestResult, TransferManager};

/// Runs each operation of the wrapped manager on tokio's blocking pool.
///
/// Clones share one manager; the lock serializes their calls.
pub struct AsyncTransferManager<M> {
    inner: Arc<Mutex<M>>,
}

impl<M> Clone for AsyncTransferManager<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: TransferManager + Send + 'static> AsyncTransferManager<M> {
    pub fn new(manager: M) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut M) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut manager = inner.blocking_lock();
            op(&mut *manager)
        })
        .await?
    }

    async fn probe<F>(&self, name: &'static str, op: F) -> bool
    where
        F: FnOnce(&mut M) -> bool + Send + 'static,
    {
        match self.run(move |manager| Ok(op(manager))).await {
            Ok(result) => result,
            Err(e) => {
                warn!(probe = name, error = %e, "probe task failed");
                false
            }
        }
    }

    pub async fn connect(&self) -> Result<()> {
        self.run(|manager| manager.connect()).await
    }

    pub async fn disconnect(&self) {
        let result = self
            .run(|manager| {
                manager.disconnect();
                Ok(())
            })
            .await;
        if let Err(e) = result {
            warn!(error = %e, "disconnect task failed");
        }
    }

    pub async fn init(&self, create_if_required: bool, repo_file: RemoteFile) -> Result<()> {
        self.run(move |manager| manager.init(create_if_required, &repo_file))
            .await
    }

    pub async fn upload(&self, local_file: PathBuf, remote_file: RemoteFile) -> Result<()> {
        self.run(move |manager| manager.upload(&local_file, &remote_file))
            .await
    }

    pub async fn download(&self, remote_file: RemoteFile, local_file: PathBuf) -> Result<()> {
        self.run(move |manager| manager.download(&remote_file, &local_file))
            .await
    }

    pub async fn delete(&self, remote_file: RemoteFile) -> Result<bool> {
        self.run(move |manager| manager.delete(&remote_file)).await
    }

    pub async fn move_file(&self, source: RemoteFile, target: RemoteFile) -> Result<()> {
        self.run(move |manager| manager.move_file(&source, &target))
            .await
    }

    pub async fn list<F>(&self, file_type: RemoteFileType, factory: F) -> Result<HashSet<F::Output>>
    where
        F: RemoteFileFactory + Send + 'static,
        F::Output: Send + 'static,
    {
        self.run(move |manager| manager.list(file_type, &factory))
            .await
    }

    pub async fn test_target_can_write(&self) -> bool {
        self.probe("test_target_can_write", |manager| manager.test_target_can_write())
            .await
    }

    pub async fn test_target_exists(&self) -> bool {
        self.probe("test_target_exists", |manager| manager.test_target_exists())
            .await
    }

    pub async fn test_target_can_create(&self) -> bool {
        self.probe("test_target_can_create", |manager| manager.test_target_can_create())
            .await
    }

    pub async fn test_repo_file_exists(&self, repo_file: RemoteFile) -> bool {
        self.probe("test_repo_file_exists", move |manager| {
            manager.test_repo_file_exists(&repo_file)
        })
        .await
    }

    pub async fn test(&self, test_create_target: bool) -> StorageTestResult {
        self.run(move |manager| Ok(manager.test(test_create_target)))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "storage test task failed");
                StorageTestResult::default()
            })
    }
}

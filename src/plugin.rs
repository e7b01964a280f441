//! Registration identity of the FTP backend.

use std::sync::Arc;

use crate::cache::Cache;
use crate::config::FtpTransferSettings;
use crate::error::Result;
use crate::manager::FtpTransferManager;

#[derive(Debug, Clone, Copy, Default)]
pub struct FtpTransferPlugin;

impl FtpTransferPlugin {
    pub const ID: &'static str = "ftp";
    pub const NAME: &'static str = "FTP";

    pub fn new() -> Self {
        Self
    }

    pub fn id(&self) -> &'static str {
        Self::ID
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn create_empty_settings(&self) -> FtpTransferSettings {
        FtpTransferSettings::default()
    }

    pub fn create_transfer_manager(
        &self,
        settings: &FtpTransferSettings,
        cache: Arc<dyn Cache>,
    ) -> Result<FtpTransferManager> {
        settings.create_transfer_manager(cache)
    }
}

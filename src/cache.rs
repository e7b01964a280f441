//! Local staging area for downloads.

use std::io;
use std::path::{Path, PathBuf};

/// Supplies temporary local files that downloads are staged into.
///
/// Implementations must tolerate concurrent calls from several transfer
/// managers sharing one cache.
pub trait Cache: Send + Sync {
    fn create_temp_file(&self, name_hint: &str) -> io::Result<PathBuf>;
}

/// A [`Cache`] creating uniquely named files in one local directory.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache in the system's temporary directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Cache for LocalCache {
    fn create_temp_file(&self, name_hint: &str) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let file = tempfile::Builder::new()
            .prefix(&format!("temp-{}-", name_hint))
            .tempfile_in(&self.dir)?;

        // The caller owns the file from here on.
        let path = file.into_temp_path().keep().map_err(|e| e.error)?;
        Ok(path)
    }
}

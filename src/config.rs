use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::Cache;
use crate::error::{Result, StorageError};
use crate::manager::FtpTransferManager;

pub const DEFAULT_PORT: u16 = 21;

/// Connection settings of one FTP repository.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpTransferSettings {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for FtpTransferSettings {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            username: String::new(),
            password: String::new(),
            path: String::new(),
            port: DEFAULT_PORT,
        }
    }
}

/// Describes one recognized option for setup prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub sensitive: bool,
}

const PROPERTIES: [PropertyDescriptor; 5] = [
    PropertyDescriptor {
        name: "hostname",
        label: "Host",
        required: true,
        sensitive: false,
    },
    PropertyDescriptor {
        name: "username",
        label: "Username",
        required: true,
        sensitive: false,
    },
    PropertyDescriptor {
        name: "password",
        label: "Password",
        required: true,
        sensitive: true,
    },
    PropertyDescriptor {
        name: "path",
        label: "Path",
        required: true,
        sensitive: false,
    },
    PropertyDescriptor {
        name: "port",
        label: "Port",
        required: false,
        sensitive: false,
    },
];

impl FtpTransferSettings {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            path: path.into(),
            port: DEFAULT_PORT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Checks that the settings can address a repository, naming the first
    /// missing value.
    pub fn validate(&self) -> Result<()> {
        if self.hostname.trim().is_empty() {
            return Err(StorageError::InvalidSettings("hostname is missing".to_string()));
        }
        if self.path.trim().is_empty() {
            return Err(StorageError::InvalidSettings("path is missing".to_string()));
        }
        if self.port == 0 {
            return Err(StorageError::InvalidSettings("port must not be 0".to_string()));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn properties() -> &'static [PropertyDescriptor] {
        &PROPERTIES
    }

    /// Builds a manager for these settings after validating them.
    pub fn create_transfer_manager(&self, cache: Arc<dyn Cache>) -> Result<FtpTransferManager> {
        self.validate()?;
        Ok(FtpTransferManager::new(self, cache))
    }

    /// Reads settings from `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| StorageError::io(format!("cannot read {}", path.display()), e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes settings to `path`. The password is never written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::io(format!("cannot create {}", parent.display()), e))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| StorageError::io(format!("cannot write {}", path.display()), e))
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "syncany", "ftp-transfer")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }
}

impl fmt::Display for FtpTransferSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FtpTransferSettings[hostname={}:{}, username={}, path={}]",
            self.hostname, self.port, self.username, self.path
        )
    }
}

impl fmt::Debug for FtpTransferSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpTransferSettings")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("path", &self.path)
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings() -> FtpTransferSettings {
        FtpTransferSettings::new("ftp.example.com", "testuser", "testpass", "/repo")
    }

    #[test]
    fn test_default_settings() {
        let settings = FtpTransferSettings::default();
        assert_eq!(settings.hostname, "");
        assert_eq!(settings.username, "");
        assert_eq!(settings.password, "");
        assert_eq!(settings.port, 21);
        assert!(!settings.is_valid());
    }

    #[test]
    fn test_settings_serialization() {
        let settings = settings().with_port(2121);

        let json = serde_json::to_string_pretty(&settings).unwrap();
        assert!(json.contains("ftp.example.com"));
        assert!(json.contains("testuser"));
        assert!(!json.contains("testpass")); // Password should be skipped
        assert!(json.contains("2121"));

        let decoded: FtpTransferSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.hostname, "ftp.example.com");
        assert_eq!(decoded.password, ""); // Password not serialized
        assert_eq!(decoded.port, 2121);
    }

    #[test]
    fn test_port_defaults_when_missing() {
        let decoded: FtpTransferSettings =
            serde_json::from_str(r#"{"hostname":"h","username":"u","path":"/p"}"#).unwrap();
        assert_eq!(decoded.port, 21);
        assert!(decoded.is_valid());
    }

    #[test]
    fn test_validate_names_missing_value() {
        let mut settings = settings();
        assert!(settings.validate().is_ok());

        settings.path = String::new();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("path"));

        settings.hostname = "  ".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("hostname"));
    }

    #[test]
    fn test_display_and_debug_hide_password() {
        let settings = settings();
        assert!(!settings.to_string().contains("testpass"));
        assert!(!format!("{:?}", settings).contains("testpass"));
        assert!(settings.to_string().contains("ftp.example.com:21"));
    }

    #[test]
    fn test_properties() {
        let properties = FtpTransferSettings::properties();
        let names: Vec<_> = properties.iter().map(|p| p.name).collect();
        assert_eq!(names, ["hostname", "username", "password", "path", "port"]);

        let sensitive: Vec<_> = properties.iter().filter(|p| p.sensitive).map(|p| p.name).collect();
        assert_eq!(sensitive, ["password"]);
        assert!(!properties[4].required);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        settings().save(&path).unwrap();
        let loaded = FtpTransferSettings::load(&path).unwrap();

        assert_eq!(loaded.hostname, "ftp.example.com");
        assert_eq!(loaded.path, "/repo");
        assert_eq!(loaded.password, "");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = FtpTransferSettings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, FtpTransferSettings::default());
    }

    #[test]
    fn test_load_garbage_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let err = FtpTransferSettings::load(&path).unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }

    #[test]
    fn test_create_transfer_manager_rejects_invalid_settings() {
        let cache: Arc<dyn Cache> = Arc::new(crate::cache::LocalCache::system());
        let result = FtpTransferSettings::default().create_transfer_manager(cache);
        assert!(matches!(result, Err(StorageError::InvalidSettings(_))));
    }
}

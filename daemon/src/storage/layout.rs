//! Storage layout configuration

use std::path::PathBuf;

use crate::storage::file::File;

/// Storage layout for the daemon
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Settings file for one environment
    pub fn settings_file(&self, environment: &str) -> File {
        File::new(self.base_dir.join(format!("settings.{}.json", environment)))
    }

    /// Directory for file-based log output
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        // Use /etc/slipway on Linux, or user home directory on other platforms
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/etc/slipway");

        #[cfg(not(target_os = "linux"))]
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".slipway");

        Self::new(base_dir)
    }
}

// Add dirs crate functionality inline for cross-platform support
#[cfg(not(target_os = "linux"))]
mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_file_is_keyed_by_environment() {
        let layout = StorageLayout::new("/tmp/slipway-test");
        let dev = layout.settings_file("development");
        let prod = layout.settings_file("production");
        assert_ne!(dev.path(), prod.path());
        assert!(dev.path().ends_with("settings.development.json"));
    }
}

//! Data directory layout

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Directory name under the platform data directory
pub const APP_DIR: &str = "keyroster";

/// The directory holding all of keyroster's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `home` if given, else the platform data directory
    pub fn resolve(home: Option<&Path>) -> Result<Self> {
        let root = match home {
            Some(home) => home.to_path_buf(),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .ok_or(ConfigError::NoDataDir)?,
        };
        debug!(root = %root.display(), "resolved data directory");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn teams_dir(&self) -> PathBuf {
        self.root.join("teams")
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.root.join("keys")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Default age identity unlocking the keyring
    pub fn identity_file(&self) -> PathBuf {
        self.root.join("identity.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let data = DataDir::resolve(Some(Path::new("/tmp/kr"))).unwrap();

        assert_eq!(data.root(), Path::new("/tmp/kr"));
        assert_eq!(data.teams_dir(), Path::new("/tmp/kr/teams"));
        assert_eq!(data.keys_dir(), Path::new("/tmp/kr/keys"));
        assert_eq!(data.logs_dir(), Path::new("/tmp/kr/logs"));
        assert_eq!(data.identity_file(), Path::new("/tmp/kr/identity.txt"));
    }
}

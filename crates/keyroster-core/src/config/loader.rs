//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    info!(path = %path.display(), "loading config");

    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find the configuration file in `dir`. Parent directories aren't searched.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    debug!(dir = %dir.display(), "searching for config file");

    let found = config_file_names()
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file());

    match &found {
        Some(path) => info!(path = %path.display(), "found config file"),
        None => debug!("no config file found"),
    }
    found
}

/// Load configuration from a directory
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration, or defaults when there's no config file.
///
/// A config file that exists but is broken is still an error.
pub fn load_config_or_default(dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    match load_config_from_dir(dir) {
        Ok((config, path)) => Ok((config, Some(path))),
        Err(ConfigError::NotFound(_)) => {
            debug!(dir = %dir.display(), "no config found, using defaults");
            Ok((Config::default(), None))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningBackend;
    use tempfile::TempDir;

    #[test]
    fn test_find_config() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("keyroster.toml");
        std::fs::write(&config_path, "[signing]\nbackend = \"gpg\"\n").unwrap();

        assert_eq!(find_config(temp.path()), Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_visible_file() {
        let temp = TempDir::new().unwrap();
        let visible = temp.path().join("keyroster.toml");
        std::fs::write(&visible, "").unwrap();
        std::fs::write(temp.path().join(".keyroster.toml"), "").unwrap();

        assert_eq!(find_config(temp.path()), Some(visible));
    }

    #[test]
    fn test_find_config_ignores_parent() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("keyroster.toml"), "").unwrap();
        let child = temp.path().join("child");
        std::fs::create_dir(&child).unwrap();

        assert_eq!(find_config(&child), None);
    }

    #[test]
    fn test_load_config() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("keyroster.toml");
        std::fs::write(
            &config_path,
            "[signing]\nbackend = \"gpg\"\ngpg_path = \"/usr/local/bin/gpg2\"\n\n[logging]\nfile = false\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.signing.backend(), Some(SigningBackend::Gpg));
        assert_eq!(config.signing.gpg_path, "/usr/local/bin/gpg2");
        assert!(!config.logging.file);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_config_or_default() {
        let temp = TempDir::new().unwrap();

        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.is_none());

        std::fs::write(temp.path().join("keyroster.toml"), "[signing]\nbackend = \"smartcard\"\n")
            .unwrap();
        let err = load_config_or_default(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_config_syntax_error() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("keyroster.toml");
        std::fs::write(&config_path, "[signing\n").unwrap();

        assert!(matches!(load_config(&config_path), Err(ConfigError::TomlError(_))));
    }
}

//! Configuration validation

use keyroster_signing::Fingerprint;
use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::{Config, SigningBackend};

/// Log levels accepted in `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_signing(config)?;
    validate_logging(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_signing(config: &Config) -> Result<()> {
    if config.signing.backend().is_none() {
        let names: Vec<_> = SigningBackend::ALL.iter().map(|b| b.as_str()).collect();
        return Err(ConfigError::InvalidValue {
            field: "signing.backend".to_string(),
            message: format!("must be one of: {}", names.join(", ")),
        });
    }

    if config.signing.gpg_path.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "signing.gpg_path".to_string(),
            message: "gpg path cannot be empty".to_string(),
        });
    }

    if let Some(path) = &config.signing.identity_file {
        if path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "signing.identity_file".to_string(),
                message: "identity file path cannot be empty".to_string(),
            });
        }
    }

    if let Some(key) = &config.signing.default_key {
        if let Err(e) = Fingerprint::parse(key) {
            return Err(ConfigError::InvalidValue {
                field: "signing.default_key".to_string(),
                message: e.to_string(),
            });
        }
    }

    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::InvalidValue {
            field: "logging.level".to_string(),
            message: format!("must be one of: {}", LOG_LEVELS.join(", ")),
        });
    }
    Ok(())
}

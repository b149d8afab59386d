//! Configuration types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::defaults::{DEFAULT_GPG_PATH, DEFAULT_LOG_LEVEL};

/// Main configuration for keyroster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which keys sign and verify rosters
    pub signing: SigningConfig,

    /// Log output
    pub logging: LoggingConfig,
}

/// Signing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// `ed25519` (local keyring) or `gpg`
    pub backend: String,

    /// Path to the gpg binary
    pub gpg_path: String,

    /// Fingerprint of the key to sign with when none is given
    pub default_key: Option<String>,

    /// Age identity that unlocks the Ed25519 keyring
    /// (default: `identity.txt` in the data directory)
    pub identity_file: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            backend: SigningBackend::Ed25519.to_string(),
            gpg_path: DEFAULT_GPG_PATH.to_string(),
            default_key: None,
            identity_file: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console level when `RUST_LOG` isn't set
    pub level: String,

    /// Also write JSON logs under the data directory
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: true,
        }
    }
}

/// Supported key backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningBackend {
    Ed25519,
    Gpg,
}

impl SigningBackend {
    pub const ALL: [SigningBackend; 2] = [SigningBackend::Ed25519, SigningBackend::Gpg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::Gpg => "gpg",
        }
    }
}

impl fmt::Display for SigningBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown signing backend '{s}'"))
    }
}

impl SigningConfig {
    /// Backend named by `backend`; validated configs always have one
    pub fn backend(&self) -> Option<SigningBackend> {
        self.backend.parse().ok()
    }
}

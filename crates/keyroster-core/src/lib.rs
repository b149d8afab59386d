//! Keyroster Core - configuration and on-disk layout
//!
//! Everything keyroster keeps lives under one data directory:
//!
//! ```text
//! <data>/keyroster.toml   optional configuration
//! <data>/teams/           team rosters and signatures
//! <data>/keys/            Ed25519 keyring
//! <data>/db.json          event database
//! <data>/logs/            log files
//! ```

pub mod config;
pub mod error;
pub mod paths;

pub use config::{Config, LoggingConfig, SigningBackend, SigningConfig};
pub use error::{ConfigError, Result};
pub use paths::DataDir;

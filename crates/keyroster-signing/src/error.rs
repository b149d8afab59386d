//! Error types for signing and verification

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for signing operations
pub type Result<T> = std::result::Result<T, SigningError>;

/// Signing-related errors
#[derive(Debug, Error)]
pub enum SigningError {
    /// The caller passed an empty signature
    #[error("empty signature")]
    EmptySignature,

    /// Not a 40 hex digit fingerprint
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// ASCII armor could not be decoded
    #[error("invalid armor: {0}")]
    InvalidArmor(String),

    /// Armor decoded but the packet inside is broken
    #[error("malformed signature packet: {0}")]
    MalformedPacket(String),

    /// Well-formed signature using something we don't verify
    #[error("unsupported signature: {0}")]
    Unsupported(String),

    /// None of the candidate keys issued the signature
    #[error("signature made by unknown entity")]
    UnknownIssuer,

    /// The quick-check hash prefix disagrees with the signed data
    #[error("invalid signature: hash tag doesn't match")]
    HashTagMismatch,

    /// Cryptographic verification failed
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Public or secret key material is unusable
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Key not present in the keyring
    #[error("Signing key not found: {0}")]
    KeyNotFound(String),

    /// Key file on disk is unusable
    #[error("Invalid key file {path}: {reason}")]
    InvalidKeyFile { path: PathBuf, reason: String },

    /// No age identity to lock or unlock secret keys with
    #[error("no identity available to unlock secret keys")]
    NoIdentity,

    /// Age identity text is unusable
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Secret key couldn't be encrypted
    #[error("couldn't encrypt secret key: {0}")]
    Sealing(String),

    /// Secret key couldn't be decrypted
    #[error("couldn't decrypt secret key: {0}")]
    Unsealing(String),

    /// External tool execution failed
    #[error("Signing tool failed: {tool} - {reason}")]
    ToolFailed { tool: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

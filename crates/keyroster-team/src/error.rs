//! Error types for team rosters

use keyroster_signing::{Fingerprint, SigningError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for team operations
pub type Result<T> = std::result::Result<T, TeamError>;

/// Team-related errors
#[derive(Debug, Error)]
pub enum TeamError {
    /// Roster text couldn't be read as a team
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Team breaks one of the roster rules
    #[error("invalid team: {0}")]
    InvalidTeam(#[from] ValidationError),

    /// Signing key doesn't belong to an admin
    #[error("can't sign with key {0} that's not an admin of the team")]
    NotAnAdmin(Fingerprint),

    /// No person with the requested fingerprint
    #[error("person not found")]
    PersonNotFound,

    /// Version counter can't go any higher
    #[error("roster version {0} can't be incremented")]
    VersionExhausted(u32),

    /// Team has no signed roster to save
    #[error("team {0} has no signed roster")]
    Unsigned(String),

    /// No team matches a query
    #[error("team not found: {0}")]
    TeamNotFound(String),

    /// More than one team matches a query
    #[error("more than one team matches '{0}', use the UUID instead")]
    AmbiguousTeam(String),

    /// Signing or verification failed
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// IO error on a roster file or directory
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TeamError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Roster document parse failures
#[derive(Debug, Error)]
pub enum ParseError {
    /// Not a TOML document of the expected shape
    #[error("failed to parse roster: {0}")]
    Syntax(#[from] toml::de::Error),

    /// `uuid` isn't a UUID
    #[error("invalid UUID in roster: {0}")]
    InvalidUuid(String),

    /// A person's fingerprint isn't 40 hex digits
    #[error("invalid fingerprint for {email}: {value}")]
    InvalidFingerprint { email: String, value: String },
}

/// Roster rule violations, checked before anything is signed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid roster: invalid UUID")]
    InvalidUuid,

    #[error("email listed more than once: {0}")]
    DuplicateEmail(String),

    #[error("fingerprint listed more than once: {0}")]
    DuplicateFingerprint(Fingerprint),

    #[error("team has no members")]
    NoMembers,

    #[error("team has no administrators")]
    NoAdministrators,
}

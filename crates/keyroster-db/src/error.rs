//! Database errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type for database operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Events need a verb to be told apart
    #[error("verb can't be empty")]
    EmptyVerb,

    /// Database file couldn't be read or written
    #[error("couldn't access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Database file isn't valid JSON of the expected shape
    #[error("error loading json from '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

//! Centralized error types for mboxdb.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxdb library.
///
/// Only resource-level faults live here. Decoding problems (bad charsets,
/// malformed dates, unparseable MIME) are absorbed by the normalizer and
/// never surface as errors.
#[derive(Error, Debug)]
pub enum IngestError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified MBOX file does not exist.
    #[error("MBOX file not found: {0}")]
    FileNotFound(PathBuf),

    /// A database-level failure (open, schema creation, transaction).
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Convenience alias for `Result<T, IngestError>`.
pub type Result<T> = std::result::Result<T, IngestError>;

impl IngestError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all operations in the `packzip` crate.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The request cannot be carried out at all: empty input list, a
    /// destination directory that cannot be prepared, a malformed manifest.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A source file vanished between resolution and I/O. Recoverable: the
    /// writer logs a warning and skips the file.
    #[error("Source file not found: '{}'", path.display())]
    MissingSource { path: PathBuf },

    /// An I/O error occurred while reading a source or writing the archive.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// The archive would not fit the classic (non-ZIP64) format.
    #[error("Archive exceeds ZIP32 limits: {0}")]
    Zip32Limit(String),
}

impl ArchiveError {
    /// Wraps an I/O error together with the path it happened on.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ArchiveError::Io {
            source,
            path: path.into(),
        }
    }

    /// True for errors the writer absorbs as a warning instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ArchiveError::MissingSource { .. })
    }
}

// Generic IO error conversion that doesn't require a path
impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        ArchiveError::Io {
            source: err,
            path: PathBuf::new(),
        }
    }
}

/// Result type for packzip operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

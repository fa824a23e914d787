//! Common types shared by the normalizer, the writer and the builder.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::compress::{clamp_level, CompressionAlgo};

/// A file to be packaged. Existence, size and timestamp are only looked up
/// when the writer reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<PathBuf> for SourceFile {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for SourceFile {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<&str> for SourceFile {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Metadata of one entry as it was written to the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Archive-relative name: `/`-separated, no leading separator, no drive.
    pub name: String,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub modified: SystemTime,
    pub crc32: u32,
    pub algo: CompressionAlgo,
}

/// One archive-construction request. Immutable once built.
///
/// ```
/// use packzip::common::ArchiveRequest;
///
/// let request = ArchiveRequest::new(vec!["/data/a.txt".into()], "/tmp/out.zip")
///     .with_level(99)
///     .with_flatten(true);
/// assert_eq!(request.level(), 9);
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    files: Vec<SourceFile>,
    destination: PathBuf,
    level: i32,
    flatten: bool,
    comment: Option<String>,
    base_path: Option<PathBuf>,
    stamp: Option<SystemTime>,
}

/// Level used when the caller does not ask for one.
pub const DEFAULT_LEVEL: i32 = 6;

impl ArchiveRequest {
    pub fn new(files: Vec<SourceFile>, destination: impl Into<PathBuf>) -> Self {
        Self {
            files,
            destination: destination.into(),
            level: DEFAULT_LEVEL,
            flatten: false,
            comment: None,
            base_path: None,
            stamp: None,
        }
    }

    /// Any integer is accepted; it is clamped into `0..=9`.
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = clamp_level(level);
        self
    }

    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Overrides base-path inference with an explicit directory.
    pub fn with_base_path(mut self, base: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base.into());
        self
    }

    /// Uses one timestamp for every entry instead of each file's mtime.
    pub fn with_stamp(mut self, stamp: SystemTime) -> Self {
        self.stamp = Some(stamp);
        self
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// The clamped compression level.
    pub fn level(&self) -> u32 {
        clamp_level(self.level) as u32
    }

    pub fn algo(&self) -> CompressionAlgo {
        CompressionAlgo::for_level(self.level)
    }

    pub fn flatten(&self) -> bool {
        self.flatten
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub fn stamp(&self) -> Option<SystemTime> {
        self.stamp
    }
}

/// Outcome of a successful build: what went in and what was left out.
#[derive(Debug, Clone, Default)]
pub struct ArchiveReport {
    pub entries: Vec<ArchiveEntry>,
    pub skipped: Vec<PathBuf>,
}

impl ArchiveReport {
    pub fn total_uncompressed(&self) -> u64 {
        self.entries.iter().map(|e| e.uncompressed_size).sum()
    }

    pub fn total_compressed(&self) -> u64 {
        self.entries.iter().map(|e| e.compressed_size).sum()
    }
}

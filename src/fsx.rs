//! Filesystem access port.
//!
//! The writer never touches `std::fs` for source files directly; it goes
//! through [`FileSystem`] so tests can substitute an in-memory tree and
//! simulate files disappearing between resolution and I/O.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

/// Read-only view of the source files.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    /// Reads the whole file into memory.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Last-write time of the file.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

/// The real filesystem, backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    data: Vec<u8>,
    modified: SystemTime,
}

/// In-memory substitute for [`OsFileSystem`].
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, MemoryFile>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn insert(
        &self,
        path: impl Into<PathBuf>,
        data: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) {
        let file = MemoryFile {
            data: data.into(),
            modified,
        };
        self.lock().insert(path.into(), file);
    }

    /// Removes a file, returning whether it was present.
    pub fn remove(&self, path: &Path) -> bool {
        self.lock().remove(path).is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, MemoryFile>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get(&self, path: &Path) -> io::Result<MemoryFile> {
        self.lock().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.get(path).map(|f| f.data)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.get(path).map(|f| f.modified)
    }
}

//! # ZIP Archive Writer
//!
//! Serializes one ordered ZIP stream. Every entry is written completely
//! (local header, then payload) before the next one starts, and offsets are
//! tracked by counting bytes instead of seeking, so the output may be any
//! `Write`: a file, a pipe or a socket.
//!
//! The archive layout is:
//! 1.  **Entries**: `[local header][payload]`, one per file, in input order.
//! 2.  **Central directory**: one record per entry, same order.
//! 3.  **End of central directory**: entry count, directory offset and size,
//!     followed by the optional archive comment.
//!
//! Each file is read fully into memory, checksummed and compressed before
//! its header is emitted. Sizes and CRC are therefore known up front and no
//! data descriptors are needed.

pub mod format;

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::checksum;
use crate::common::{ArchiveEntry, ArchiveReport};
use crate::compress::CompressionAlgo;
use crate::error::{ArchiveError, Result};
use crate::fsx::FileSystem;
use crate::log::Logger;
use format::{DosDateTime, EntryHeader, FLAG_UTF8};

const MAX_ENTRIES: usize = u16::MAX as usize;
const MAX_U32: u64 = u32::MAX as u64;

/// Tracks how many bytes went through, standing in for `stream_position`
/// on outputs that cannot seek.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct CentralRecord {
    header: EntryHeader,
    local_header_offset: u32,
}

/// A source file paired with the entry name it will get.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub name: String,
}

/// A writer responsible for constructing a ZIP archive.
pub struct ArchiveWriter<W: Write> {
    writer: CountingWriter<BufWriter<W>>,
    algo: CompressionAlgo,
    destination: PathBuf,
    central: Vec<CentralRecord>,
}

impl<W: Write> ArchiveWriter<W> {
    /// Creates a new `ArchiveWriter`.
    ///
    /// # Arguments
    /// * `output` - Where the archive bytes go. Need not be seekable.
    /// * `algo` - How every payload is encoded.
    pub fn new(output: W, algo: CompressionAlgo) -> Self {
        // 1 MiB buffer: headers are small and would otherwise be one syscall each
        let writer = BufWriter::with_capacity(1024 * 1024, output);
        Self {
            writer: CountingWriter {
                inner: writer,
                written: 0,
            },
            algo,
            destination: PathBuf::new(),
            central: Vec::new(),
        }
    }

    /// Labels output errors with the destination path.
    pub fn with_destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = path.into();
        self
    }

    pub fn entry_count(&self) -> usize {
        self.central.len()
    }

    fn output_error(&self, err: io::Error) -> ArchiveError {
        ArchiveError::io(err, self.destination.clone())
    }

    /// Compresses and appends one entry from an in-memory buffer.
    pub fn add_entry(
        &mut self,
        name: &str,
        data: &[u8],
        modified: SystemTime,
    ) -> Result<ArchiveEntry> {
        if self.central.len() >= MAX_ENTRIES {
            return Err(ArchiveError::Zip32Limit(format!("more than {} entries", MAX_ENTRIES)));
        }
        if name.len() > u16::MAX as usize {
            return Err(ArchiveError::Zip32Limit(format!("entry name of {} bytes", name.len())));
        }
        if data.len() as u64 >= MAX_U32 {
            return Err(ArchiveError::Zip32Limit(format!("'{}' is {} bytes", name, data.len())));
        }
        let offset = self.writer.written;
        if offset >= MAX_U32 {
            return Err(ArchiveError::Zip32Limit(format!("local header offset {}", offset)));
        }

        let crc32 = checksum::compute(data);
        let payload = self.algo.encode(data).map_err(|e| self.output_error(e))?;
        if payload.len() as u64 >= MAX_U32 {
            return Err(ArchiveError::Zip32Limit(format!(
                "'{}' compresses to {} bytes",
                name,
                payload.len()
            )));
        }

        let header = EntryHeader {
            version_needed: self.algo.version_needed(),
            flags: if name.is_ascii() { 0 } else { FLAG_UTF8 },
            method: self.algo.method(),
            modified: DosDateTime::from_system_time(modified),
            crc32,
            compressed_size: payload.len() as u32,
            uncompressed_size: data.len() as u32,
            name: name.as_bytes().to_vec(),
        };

        if let Err(e) = self
            .writer
            .write_all(&header.local_bytes())
            .and_then(|_| self.writer.write_all(&payload))
        {
            return Err(self.output_error(e));
        }

        tracing::debug!(
            entry = name,
            offset,
            size = data.len(),
            compressed = payload.len(),
            crc32 = %format!("{:08x}", crc32),
            "entry written"
        );

        self.central.push(CentralRecord {
            header,
            local_header_offset: offset as u32,
        });

        Ok(ArchiveEntry {
            name: name.to_string(),
            uncompressed_size: data.len() as u64,
            compressed_size: payload.len() as u64,
            modified,
            crc32,
            algo: self.algo,
        })
    }

    /// Reads, checksums and appends one source file.
    ///
    /// Returns [`ArchiveError::MissingSource`] when the file is gone; the
    /// caller decides whether that is fatal. Any other error is.
    pub fn add_source(
        &mut self,
        fs: &dyn FileSystem,
        path: &Path,
        name: &str,
        stamp: Option<SystemTime>,
    ) -> Result<ArchiveEntry> {
        let missing = || ArchiveError::MissingSource {
            path: path.to_path_buf(),
        };
        let classify = |e: io::Error| {
            if e.kind() == io::ErrorKind::NotFound {
                missing()
            } else {
                ArchiveError::io(e, path)
            }
        };

        if !fs.exists(path) {
            return Err(missing());
        }
        let data = fs.read(path).map_err(classify)?;
        let modified = match stamp {
            Some(t) => t,
            None => fs.modified(path).map_err(classify)?,
        };
        self.add_entry(name, &data, modified)
        // `data` is released here, before the next file is read
    }

    /// Writes every source in order. Missing files and files without a usable
    /// name are logged as warnings and skipped; everything else aborts.
    pub fn write_sources(
        &mut self,
        fs: &dyn FileSystem,
        log: &dyn Logger,
        sources: &[ResolvedSource],
        stamp: Option<SystemTime>,
    ) -> Result<ArchiveReport> {
        let mut report = ArchiveReport::default();
        for source in sources {
            if source.name.is_empty() {
                log.warn(&format!("Skipping '{}': no usable entry name", source.path.display()));
                report.skipped.push(source.path.clone());
                continue;
            }
            match self.add_source(fs, &source.path, &source.name, stamp) {
                Ok(entry) => {
                    log.info(&format!(
                        "Added '{}' as {} ({} -> {} bytes, {})",
                        source.path.display(),
                        entry.name,
                        entry.uncompressed_size,
                        entry.compressed_size,
                        entry.algo.name()
                    ));
                    report.entries.push(entry);
                }
                Err(e) if e.is_recoverable() => {
                    log.warn(&format!("Skipping '{}': file does not exist", source.path.display()));
                    report.skipped.push(source.path.clone());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Finalizes the archive by writing the central directory and the end
    /// record, then flushes and hands back the underlying output.
    ///
    /// This method consumes the writer and must be called to produce a valid archive.
    pub fn finish(mut self, comment: Option<&str>) -> Result<W> {
        let comment = comment.unwrap_or("").as_bytes();
        if comment.len() > u16::MAX as usize {
            return Err(ArchiveError::Zip32Limit(format!(
                "archive comment of {} bytes",
                comment.len()
            )));
        }

        let cd_offset = self.writer.written;
        for record in &self.central {
            let bytes = record.header.central_bytes(record.local_header_offset);
            if let Err(e) = self.writer.write_all(&bytes) {
                return Err(self.output_error(e));
            }
        }
        let cd_size = self.writer.written - cd_offset;
        if cd_offset >= MAX_U32 || cd_size >= MAX_U32 {
            return Err(ArchiveError::Zip32Limit(format!(
                "central directory at {} ({} bytes)",
                cd_offset, cd_size
            )));
        }

        let end = format::end_of_central_dir_bytes(
            self.central.len() as u16,
            cd_size as u32,
            cd_offset as u32,
            comment,
        );
        if let Err(e) = self.writer.write_all(&end).and_then(|_| self.writer.flush()) {
            return Err(self.output_error(e));
        }
        tracing::debug!(entries = self.central.len(), cd_offset, cd_size, "archive finalized");

        let destination = self.destination;
        self.writer
            .inner
            .into_inner()
            .map_err(|e| ArchiveError::io(e.into_error(), destination))
    }
}

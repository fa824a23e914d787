//! # Payload Compression
//!
//! Maps the request's compression level onto a ZIP compression method and
//! encodes whole entry payloads. Level `0` stores bytes verbatim; `1..=9` use
//! DEFLATE through `flate2` at that level.
//!
//! Encoding works on an in-memory buffer per file. [`CompressionAlgo::encode`]
//! is the single seam where a chunked/streaming encoder could be swapped in
//! without touching the writer's contract.

use std::borrow::Cow;
use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

pub const MIN_LEVEL: i32 = 0;
pub const MAX_LEVEL: i32 = 9;

/// ZIP method id for stored entries.
pub const METHOD_STORED: u16 = 0;
/// ZIP method id for DEFLATE entries.
pub const METHOD_DEFLATED: u16 = 8;

/// Clamps any requested level into `0..=9`.
pub fn clamp_level(level: i32) -> i32 {
    level.clamp(MIN_LEVEL, MAX_LEVEL)
}

/// Defines the available compression algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgo {
    /// Plain storage without any compression.
    Store,
    /// Raw DEFLATE at the given level (1-9).
    Deflate { level: u32 },
}

impl CompressionAlgo {
    /// Picks the algorithm for a (possibly out-of-range) level.
    pub fn for_level(level: i32) -> Self {
        match clamp_level(level) {
            0 => CompressionAlgo::Store,
            l => CompressionAlgo::Deflate { level: l as u32 },
        }
    }

    /// The method id recorded in the ZIP headers.
    pub fn method(&self) -> u16 {
        match self {
            CompressionAlgo::Store => METHOD_STORED,
            CompressionAlgo::Deflate { .. } => METHOD_DEFLATED,
        }
    }

    /// Minimum reader version: 1.0 for stored, 2.0 for DEFLATE.
    pub fn version_needed(&self) -> u16 {
        match self {
            CompressionAlgo::Store => 10,
            CompressionAlgo::Deflate { .. } => 20,
        }
    }

    /// Encodes a whole payload. Stored payloads borrow the input instead of
    /// copying it.
    pub fn encode<'a>(&self, data: &'a [u8]) -> std::io::Result<Cow<'a, [u8]>> {
        match *self {
            CompressionAlgo::Store => Ok(Cow::Borrowed(data)),
            CompressionAlgo::Deflate { level } => {
                let buf = Vec::with_capacity(data.len() / 2 + 64);
                let mut encoder = DeflateEncoder::new(buf, Compression::new(level));
                encoder.write_all(data)?;
                encoder.finish().map(Cow::Owned)
            }
        }
    }

    /// Short tag for log messages.
    pub fn name(&self) -> &'static str {
        match self {
            CompressionAlgo::Store => "store",
            CompressionAlgo::Deflate { .. } => "deflate",
        }
    }
}

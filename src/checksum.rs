//! # CRC32 Checksum Engine
//!
//! Table-driven CRC32 over arbitrary byte buffers, usable both as a streaming
//! primitive ([`Crc32`]) and through the one-shot [`compute`] helpers.
//!
//! With the default parameters (reflected polynomial `0xEDB88320`, seed
//! `0xFFFFFFFF`) the result is the standard CRC-32 used by zlib and the ZIP
//! format, so any archive reader can validate the entries written by
//! [`crate::archive::ArchiveWriter`].
//!
//! Lookup tables are built lazily, at most once per distinct polynomial, and
//! are shared process-wide once published.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock};

/// Reflected form of the IEEE 802.3 polynomial.
pub const DEFAULT_POLYNOMIAL: u32 = 0xEDB8_8320;
/// Initial register value.
pub const DEFAULT_SEED: u32 = 0xFFFF_FFFF;

type Table = [u32; 256];

static DEFAULT_TABLE: OnceLock<Arc<Table>> = OnceLock::new();
static CUSTOM_TABLES: OnceLock<Mutex<HashMap<u32, Arc<Table>>>> = OnceLock::new();

fn build_table(polynomial: u32) -> Table {
    let mut table = [0u32; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut entry = i as u32;
        for _ in 0..8 {
            if entry & 1 == 1 {
                entry = (entry >> 1) ^ polynomial;
            } else {
                entry >>= 1;
            }
        }
        *slot = entry;
    }
    table
}

/// Returns the shared lookup table for `polynomial`, building it on first use.
fn table_for(polynomial: u32) -> Arc<Table> {
    if polynomial == DEFAULT_POLYNOMIAL {
        return DEFAULT_TABLE
            .get_or_init(|| Arc::new(build_table(DEFAULT_POLYNOMIAL)))
            .clone();
    }
    let cache = CUSTOM_TABLES.get_or_init(|| Mutex::new(HashMap::new()));
    // A poisoned lock only means another thread panicked mid-insert; the map
    // itself only ever holds fully built tables.
    let mut tables = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    tables
        .entry(polynomial)
        .or_insert_with(|| Arc::new(build_table(polynomial)))
        .clone()
}

/// Streaming CRC32 state.
///
/// ```
/// use packzip::checksum::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"1234");
/// crc.update(b"56789");
/// assert_eq!(crc.finalize(), 0xCBF4_3926);
/// ```
#[derive(Clone, Debug)]
pub struct Crc32 {
    table: Arc<Table>,
    seed: u32,
    state: u32,
}

impl Crc32 {
    /// Standard CRC-32 (zlib / ISO-HDLC).
    pub fn new() -> Self {
        Self::with_params(DEFAULT_SEED, DEFAULT_POLYNOMIAL)
    }

    /// A CRC32 with a custom seed and reflected polynomial.
    pub fn with_params(seed: u32, polynomial: u32) -> Self {
        Self {
            table: table_for(polynomial),
            seed,
            state: seed,
        }
    }

    /// Feeds `bytes` into the running register.
    pub fn update(&mut self, bytes: &[u8]) {
        let table = &*self.table;
        let mut crc = self.state;
        for &b in bytes {
            crc = (crc >> 8) ^ table[((b as u32 ^ crc) & 0xFF) as usize];
        }
        self.state = crc;
    }

    /// The checksum of everything fed so far. Does not consume the state, so
    /// more data may still be added afterwards.
    pub fn finalize(&self) -> u32 {
        !self.state
    }

    /// [`finalize`](Self::finalize) serialized most-significant byte first.
    pub fn finalize_bytes(&self) -> [u8; 4] {
        self.finalize().to_be_bytes()
    }

    /// Rewinds the register to the seed it was created with.
    pub fn reset(&mut self) {
        self.state = self.seed;
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for Crc32 {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One-shot standard CRC-32 of `buffer`.
pub fn compute(buffer: &[u8]) -> u32 {
    compute_with(buffer, DEFAULT_SEED, DEFAULT_POLYNOMIAL)
}

/// One-shot CRC32 with a custom seed and the default polynomial.
pub fn compute_with_seed(buffer: &[u8], seed: u32) -> u32 {
    compute_with(buffer, seed, DEFAULT_POLYNOMIAL)
}

/// One-shot CRC32 with full control over seed and polynomial.
pub fn compute_with(buffer: &[u8], seed: u32, polynomial: u32) -> u32 {
    let mut crc = Crc32::with_params(seed, polynomial);
    crc.update(buffer);
    crc.finalize()
}

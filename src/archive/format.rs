//! On-disk ZIP records (APPNOTE 4.3.7, 4.3.12, 4.3.16).
//!
//! Only the classic 32-bit layout is produced; anything that would need
//! ZIP64 is rejected by the writer before a record is serialized.

use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike};

pub const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
pub const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
pub const END_OF_CENTRAL_DIR_SIG: u32 = 0x0605_4b50;

pub const LOCAL_HEADER_LEN: usize = 30;
pub const CENTRAL_HEADER_LEN: usize = 46;
pub const END_OF_CENTRAL_DIR_LEN: usize = 22;

/// General purpose bit 11: the entry name is UTF-8.
pub const FLAG_UTF8: u16 = 1 << 11;

/// "Made by" Unix, APPNOTE version 2.0, so readers honour the mode bits below.
pub const VERSION_MADE_BY: u16 = (3 << 8) | 20;
/// Regular file, rw-r--r--.
pub const EXTERNAL_ATTR_FILE: u32 = 0o100644 << 16;

/// MS-DOS packed date and time as stored in ZIP headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable instant.
    pub const MIN: DosDateTime = DosDateTime {
        time: 0,
        date: (1 << 5) | 1,
    };
    /// 2107-12-31 23:59:58, the latest representable instant.
    pub const MAX: DosDateTime = DosDateTime {
        time: (23 << 11) | (59 << 5) | 29,
        date: (127 << 9) | (12 << 5) | 31,
    };

    /// Converts a wall-clock time. Out-of-range years are clamped; seconds
    /// are truncated to even values.
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        let year = dt.year();
        if year < 1980 {
            return Self::MIN;
        }
        if year > 2107 {
            return Self::MAX;
        }
        let time = (dt.hour() << 11) | (dt.minute() << 5) | (dt.second() / 2);
        let date = (((year - 1980) as u32) << 9) | (dt.month() << 5) | dt.day();
        DosDateTime {
            time: time as u16,
            date: date as u16,
        }
    }

    /// Converts a filesystem timestamp in the host's local time zone, which
    /// is how ZIP readers interpret DOS timestamps.
    pub fn from_system_time(t: SystemTime) -> Self {
        let local: DateTime<Local> = t.into();
        Self::from_naive(local.naive_local())
    }
}

/// Fields shared by the local and central headers of one entry.
#[derive(Debug, Clone)]
pub struct EntryHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: Vec<u8>,
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

impl EntryHeader {
    fn put_common(&self, buf: &mut Vec<u8>) {
        put_u16(buf, self.flags);
        put_u16(buf, self.method);
        put_u16(buf, self.modified.time);
        put_u16(buf, self.modified.date);
        put_u32(buf, self.crc32);
        put_u32(buf, self.compressed_size);
        put_u32(buf, self.uncompressed_size);
        put_u16(buf, self.name.len() as u16);
    }

    /// Local file header, immediately followed by the payload.
    pub fn local_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(LOCAL_HEADER_LEN + self.name.len());
        put_u32(&mut buf, LOCAL_HEADER_SIG);
        put_u16(&mut buf, self.version_needed);
        self.put_common(&mut buf);
        put_u16(&mut buf, 0); // extra field length
        buf.extend_from_slice(&self.name);
        buf
    }

    /// Central directory record pointing back at the local header.
    pub fn central_bytes(&self, local_header_offset: u32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CENTRAL_HEADER_LEN + self.name.len());
        put_u32(&mut buf, CENTRAL_HEADER_SIG);
        put_u16(&mut buf, VERSION_MADE_BY);
        put_u16(&mut buf, self.version_needed);
        self.put_common(&mut buf);
        put_u16(&mut buf, 0); // extra field length
        put_u16(&mut buf, 0); // file comment length
        put_u16(&mut buf, 0); // disk number start
        put_u16(&mut buf, 0); // internal attributes
        put_u32(&mut buf, EXTERNAL_ATTR_FILE);
        put_u32(&mut buf, local_header_offset);
        buf.extend_from_slice(&self.name);
        buf
    }
}

/// End of central directory record, with the archive comment.
pub fn end_of_central_dir_bytes(
    entries: u16,
    cd_size: u32,
    cd_offset: u32,
    comment: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(END_OF_CENTRAL_DIR_LEN + comment.len());
    put_u32(&mut buf, END_OF_CENTRAL_DIR_SIG);
    put_u16(&mut buf, 0); // this disk
    put_u16(&mut buf, 0); // disk with central directory
    put_u16(&mut buf, entries);
    put_u16(&mut buf, entries);
    put_u32(&mut buf, cd_size);
    put_u32(&mut buf, cd_offset);
    put_u16(&mut buf, comment.len() as u16);
    buf.extend_from_slice(comment);
    buf
}

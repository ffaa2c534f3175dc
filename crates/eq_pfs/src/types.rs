//! Base types for structure of PFS file.

use binrw::{binrw, BinRead, BinWrite};
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Magic bytes found at offset 4 of every archive
pub const PFS_MAGIC: [u8; 4] = *b"PFS ";

/// The only archive version this library reads and writes
pub const PFS_VERSION: u32 = 0x0002_0000;

/// Magic opening the footer, also used as the directory hash of the name blob
pub const FOOTER_MAGIC: u32 = 0x6158_0AC9;

/// Marker following the name blob pointer in the footer
pub const FOOTER_MARKER: [u8; 5] = *b"STEVE";

/// Size of [`PfsHeader`] on disk
pub const HEADER_SIZE: u64 = 12;

/// Size of [`PfsFooter`] on disk
pub const FOOTER_SIZE: u64 = 21;

/// PFS file header
///
/// The directory offset comes first so it can be patched once the rest of the archive has
/// been written. All data is stored in little endian format.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct PfsHeader {
    /// Absolute offset of the directory
    pub directory_offset: u32,

    /// Always [`PFS_MAGIC`] for a valid archive
    pub magic: [u8; 4],

    /// Always [`PFS_VERSION`] for a supported archive
    pub version: u32,
}

impl Default for PfsHeader {
    fn default() -> Self {
        Self {
            directory_offset: 0,
            magic: PFS_MAGIC,
            version: PFS_VERSION,
        }
    }
}

impl PfsHeader {
    /// Fail unless the magic and version are the ones this library understands
    pub fn validate(&self) -> Result<()> {
        if self.magic != PFS_MAGIC {
            return Err(Error::InvalidMagic(self.magic));
        }
        if self.version != PFS_VERSION {
            return Err(Error::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Length prefix of one compressed chunk
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct ChunkHeader {
    /// Number of zlib bytes following this header
    pub compressed: u32,

    /// Number of bytes the chunk inflates to
    pub decompressed: u32,
}

/// PFS directory record
///
/// Defines where an entry's chunk run starts and how large it is once inflated
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct DirectoryRecord {
    /// [`crate::hash::filename_hash`] of the entry's name
    pub hash: u32,

    /// Absolute offset of the first chunk of the entry
    pub offset: u32,

    /// Size of the entry once all of its chunks are inflated
    pub size: u32,
}

/// The directory block: a record count followed by that many records
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Directory {
    #[bw(calc = records.len() as u32)]
    count: u32,

    /// Records in the order they are stored
    #[br(count = count)]
    pub records: Vec<DirectoryRecord>,
}

impl Directory {
    /// Build a directory, sorting the records ascending by hash
    pub fn new(mut records: Vec<DirectoryRecord>) -> Self {
        records.sort_by_key(|r| r.hash);
        Self { records }
    }

    /// Number of records, the name blob included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the directory holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Size of the directory block on disk
    pub fn encoded_size(&self) -> u64 {
        4 + 12 * self.records.len() as u64
    }
}

/// Trailing block written after the directory
///
/// Older archives end right after the directory, so readers treat it as optional.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct PfsFooter {
    /// Always [`FOOTER_MAGIC`]
    pub magic: u32,

    /// Absolute offset of the name blob's chunk run
    pub name_offset: u32,

    /// Inflated size of the name blob
    pub name_size: u32,

    /// Always [`FOOTER_MARKER`]
    pub marker: [u8; 5],

    /// Unix timestamp of when the archive was written
    pub timestamp: u32,
}

impl PfsFooter {
    /// Create a footer pointing at the name blob
    pub fn new(name_offset: u32, name_size: u32, timestamp: u32) -> Self {
        Self {
            magic: FOOTER_MAGIC,
            name_offset,
            name_size,
            marker: FOOTER_MARKER,
            timestamp,
        }
    }

    /// Fail unless the magic and marker are intact
    pub fn validate(&self) -> Result<()> {
        if self.magic != FOOTER_MAGIC {
            return Err(Error::InvalidFooter(format!(
                "magic {:#010x} is not {:#010x}",
                self.magic, FOOTER_MAGIC
            )));
        }
        if self.marker != FOOTER_MARKER {
            return Err(Error::InvalidFooter(format!(
                "marker {:02X?} is not {:02X?}",
                self.marker, FOOTER_MARKER
            )));
        }
        Ok(())
    }

    /// When the archive was written
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.timestamp), 0)
    }
}

//! Types for writing PFS archives
//!

use binrw::BinWrite;
use bon::Builder;
use chrono::Utc;
use flate2::Compression;
use std::io::{Seek, SeekFrom, Write};
use tracing::{debug, instrument};

use crate::archive::ArchiveEntry;
use crate::compression::{write_chunks, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::names::encode_names;
use crate::types::{Directory, DirectoryRecord, PfsFooter, PfsHeader, FOOTER_MAGIC};

/// Options for how the PFS file should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct PfsWriterOptions {
    /// Maximum number of raw bytes compressed into a single chunk
    #[builder(default = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Zlib level, from 0 (store) to 9 (best)
    #[builder(default = 6)]
    pub compression_level: u32,

    /// Footer timestamp in unix seconds, the current time when unset
    pub timestamp: Option<u32>,
}

impl Default for PfsWriterOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PfsWriterOptions {
    fn compression(&self) -> Compression {
        Compression::new(self.compression_level.min(9))
    }

    fn timestamp(&self) -> u32 {
        self.timestamp
            .unwrap_or_else(|| u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX))
    }
}

/// Writes a set of entries as a complete PFS archive
///
/// The header is written with a placeholder directory offset which is patched once the
/// directory position is known, so the sink has to be seekable. Offsets stored in the
/// archive are absolute, so the archive is always written from the start of the sink.
///
/// ```
/// # fn doit() -> eq_pfs::error::Result<()>
/// # {
/// use eq_pfs::{ArchiveEntry, PfsWriter};
/// use eq_pfs::write::PfsWriterOptions;
///
/// let entries = [ArchiveEntry::new("hello_world.txt", b"Hello, World!".to_vec())];
///
/// // We use a buffer here, though you'd normally use a `File`
/// let writer = PfsWriter::new(std::io::Cursor::new(Vec::new()), PfsWriterOptions::builder()
///            .chunk_size(4096)
///            .build());
///
/// let buffer = writer.write(entries.iter())?;
/// assert!(!buffer.get_ref().is_empty());
///
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct PfsWriter<W: Write + Seek> {
    inner: W,
    options: PfsWriterOptions,
}

impl<W: Write + Seek> PfsWriter<W> {
    /// Wrap a sink the archive will be written to from byte 0
    pub fn new(inner: W, options: PfsWriterOptions) -> PfsWriter<W> {
        PfsWriter { inner, options }
    }

    /// Write every entry, the name blob, the directory and the footer.
    ///
    /// Entries are laid out ascending by filename hash, so the same set of entries always
    /// produces the same bytes regardless of the order they are given in.
    #[instrument(skip_all, err)]
    pub fn write<'a>(mut self, entries: impl IntoIterator<Item = &'a ArchiveEntry>) -> Result<W> {
        let mut entries: Vec<&ArchiveEntry> = entries.into_iter().collect();
        entries.sort_by_key(|e| e.hash());

        self.inner.seek(SeekFrom::Start(0))?;
        PfsHeader::default().write(&mut self.inner)?;

        let mut records = Vec::with_capacity(entries.len() + 1);
        for entry in &entries {
            let record = self
                .write_payload(entry.hash(), entry.data())
                .map_err(|e| e.in_file(entry.name()))?;
            debug!(
                name = entry.name(),
                hash = format_args!("{:#010x}", record.hash),
                offset = record.offset,
                size = record.size,
                "wrote entry"
            );
            records.push(record);
        }

        let names = encode_names(&entries.iter().map(|e| e.name()).collect::<Vec<_>>())?;
        let name_record = self.write_payload(FOOTER_MAGIC, &names)?;
        debug!(
            count = entries.len(),
            offset = name_record.offset,
            size = name_record.size,
            "wrote name blob"
        );
        records.push(name_record);

        let directory_offset = self.position()?;
        let directory = Directory::new(records);
        directory.write(&mut self.inner)?;
        debug!(
            records = directory.len(),
            offset = directory_offset,
            "wrote directory"
        );

        PfsFooter::new(
            name_record.offset,
            name_record.size,
            self.options.timestamp(),
        )
        .write(&mut self.inner)?;

        let end = self.inner.stream_position()?;
        self.inner.seek(SeekFrom::Start(0))?;
        PfsHeader {
            directory_offset,
            ..Default::default()
        }
        .write(&mut self.inner)?;
        self.inner.seek(SeekFrom::Start(end))?;
        self.inner.flush()?;

        Ok(self.inner)
    }

    fn write_payload(&mut self, hash: u32, data: &[u8]) -> Result<DirectoryRecord> {
        let offset = self.position()?;
        let size = u32::try_from(data.len()).map_err(|_| Error::TooLarge("entry size"))?;
        write_chunks(
            &mut self.inner,
            data,
            self.options.chunk_size,
            self.options.compression(),
        )?;
        Ok(DirectoryRecord { hash, offset, size })
    }

    fn position(&mut self) -> Result<u32> {
        u32::try_from(self.inner.stream_position()?)
            .map_err(|_| Error::TooLarge("archive offset"))
    }
}

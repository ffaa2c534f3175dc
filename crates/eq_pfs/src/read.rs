//! Types for reading PFS archives
//!
//! The directory does not say which record holds the name blob, and records do not link to
//! each other. Reading therefore jumps to the directory first, then walks the data region
//! from the end of the header, matching each chunk run to the record whose offset equals the
//! current position, and recognizes the name blob by its declared name count.

use binrw::BinRead;
use std::collections::{HashMap, VecDeque};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, instrument, trace, warn};

use crate::{
    archive::ArchiveEntry,
    compression::read_chunks,
    error::{Error, Result},
    names::{declared_count, decode_names, NameTable},
    types::{Directory, DirectoryRecord, PfsFooter, PfsHeader, FOOTER_SIZE, HEADER_SIZE},
};

/// What a decoded chunk run turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum Blob {
    /// The name blob, parsed into its names
    NameTable(Vec<String>),

    /// An ordinary entry payload, still keyed only by its directory hash
    Payload(Vec<u8>),
}

/// Decide whether a decoded run is the name blob of a directory holding `record_count` records.
///
/// A run is the name blob when its first four bytes equal `record_count - 1` (every record
/// except the name blob itself) and the rest parses as a name blob. Anything else, including
/// runs shorter than four bytes, is a payload.
pub fn classify(data: Vec<u8>, record_count: usize) -> Blob {
    if !is_name_candidate(&data, record_count) {
        return Blob::Payload(data);
    }
    match decode_names(&data) {
        Ok(names) => Blob::NameTable(names),
        Err(e) => {
            debug!(error = %e, "name count matched but the blob does not parse as names");
            Blob::Payload(data)
        }
    }
}

fn is_name_candidate(data: &[u8], record_count: usize) -> bool {
    declared_count(data).is_some_and(|count| count as usize == record_count.saturating_sub(1))
}

/// Directory records keyed by the offset their chunk run starts at
///
/// Zero-length entries have no chunks, so they share an offset with whatever follows them.
/// Records sharing an offset are handed out empty ones first, then in directory order.
#[derive(Debug, Default)]
struct OffsetIndex {
    records: HashMap<u32, VecDeque<DirectoryRecord>>,
}

impl OffsetIndex {
    fn new(directory: &Directory) -> Self {
        let mut records: HashMap<u32, VecDeque<DirectoryRecord>> = HashMap::new();
        for record in &directory.records {
            records.entry(record.offset).or_default().push_back(*record);
        }
        for queue in records.values_mut() {
            queue.make_contiguous().sort_by_key(|r| r.size != 0);
        }
        Self { records }
    }

    fn take(&mut self, position: u64) -> Option<DirectoryRecord> {
        let offset = u32::try_from(position).ok()?;
        self.records.get_mut(&offset)?.pop_front()
    }
}

/// Everything read out of an archive
#[derive(Debug, Clone)]
pub struct PfsContents {
    /// Named entries, in the order their data is stored
    pub entries: Vec<ArchiveEntry>,

    /// The directory as stored, name blob record included
    pub directory: Directory,

    /// The footer, if the archive has one
    pub footer: Option<PfsFooter>,
}

/// PFS archive reader
///
/// ```no_run
/// fn list_pfs_contents(reader: impl std::io::Read + std::io::Seek) -> eq_pfs::error::Result<()> {
///     let contents = eq_pfs::PfsReader::new(reader).read()?;
///
///     for entry in &contents.entries {
///         println!("Filename: {} ({} bytes)", entry.name(), entry.data().len());
///     }
///
///     Ok(())
/// }
/// ```
pub struct PfsReader<R> {
    reader: R,
}

impl<R: Read + Seek> PfsReader<R> {
    /// Wrap a source holding an archive that starts at offset 0
    pub fn new(reader: R) -> PfsReader<R> {
        PfsReader { reader }
    }

    /// Decode every entry of the archive
    #[instrument(skip_all, err)]
    pub fn read(mut self) -> Result<PfsContents> {
        self.reader.seek(SeekFrom::Start(0))?;
        let header = PfsHeader::read(&mut self.reader)?;
        header.validate()?;

        let directory = self.read_directory(header.directory_offset)?;
        self.reader.seek(SeekFrom::Start(HEADER_SIZE))?;

        let mut index = OffsetIndex::new(&directory);
        let mut names: Option<(DirectoryRecord, NameTable)> = None;
        let mut payloads = Vec::with_capacity(directory.len().saturating_sub(1));

        for i in 0..directory.len() {
            let position = self.reader.stream_position()?;
            let record = index
                .take(position)
                .ok_or(Error::OffsetMismatch { position })?;
            trace!(
                index = i,
                hash = format_args!("{:#010x}", record.hash),
                offset = record.offset,
                size = record.size,
                "reading record"
            );

            let data = read_chunks(&mut self.reader, record.size)
                .map_err(|e| e.in_file(format!("record {:#010x}", record.hash)))?;

            let blob = match &names {
                None => classify(data, directory.len()),
                Some((first, _)) => {
                    if is_name_candidate(&data, directory.len()) {
                        warn!(
                            offset = record.offset,
                            first = first.offset,
                            "second name blob candidate, keeping the first"
                        );
                    }
                    Blob::Payload(data)
                }
            };

            match blob {
                Blob::NameTable(table) => {
                    debug!(
                        count = table.len(),
                        offset = record.offset,
                        "found name blob"
                    );
                    names = Some((record, NameTable::new(table)));
                }
                Blob::Payload(data) => payloads.push((record, data)),
            }
        }

        let name_record = names.as_ref().map(|(record, _)| *record);
        let table = names.map(|(_, table)| table).unwrap_or_default();
        let entries = payloads
            .into_iter()
            .map(|(record, data)| {
                table
                    .get(record.hash)
                    .map(|name| ArchiveEntry::new(name, data))
                    .ok_or(Error::NameNotFound { hash: record.hash })
            })
            .collect::<Result<Vec<_>>>()?;

        let footer_offset = u64::from(header.directory_offset) + directory.encoded_size();
        let footer = self.read_footer(footer_offset)?;
        if let (Some(footer), Some(record)) = (&footer, name_record) {
            if footer.name_offset != record.offset || footer.name_size != record.size {
                warn!(
                    footer_offset = footer.name_offset,
                    footer_size = footer.name_size,
                    offset = record.offset,
                    size = record.size,
                    "footer does not point at the name blob"
                );
            }
        }

        debug!(entries = entries.len(), "read archive");
        Ok(PfsContents {
            entries,
            directory,
            footer,
        })
    }

    fn read_directory(&mut self, offset: u32) -> Result<Directory> {
        self.reader.seek(SeekFrom::Start(u64::from(offset)))?;
        let directory = Directory::read(&mut self.reader)?;
        debug!(records = directory.len(), offset, "read directory");
        Ok(directory)
    }

    fn read_footer(&mut self, offset: u64) -> Result<Option<PfsFooter>> {
        let end = self.reader.seek(SeekFrom::End(0))?;
        if end <= offset {
            debug!("archive has no footer");
            return Ok(None);
        }
        if end - offset < FOOTER_SIZE {
            return Err(Error::TruncatedStream);
        }

        self.reader.seek(SeekFrom::Start(offset))?;
        let footer = PfsFooter::read(&mut self.reader)?;
        footer.validate()?;
        debug!(timestamp = footer.timestamp, "read footer");
        Ok(Some(footer))
    }
}

//! Chunked zlib framing of entry payloads.
//!
//! An entry is stored as a run of chunks, each a [`ChunkHeader`] followed by an independent zlib
//! stream. The run has no terminator of its own: a reader keeps consuming chunks until the sum
//! of their inflated lengths reaches the size recorded in the directory.

use std::io::{Read, Seek, Write};

use binrw::{BinRead, BinWrite};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use tracing::{instrument, trace};

use crate::error::{eof_as_truncated, Error, Result};
use crate::types::ChunkHeader;

/// Raw bytes stored per chunk unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Compress `data` into a run of chunks and write it at the current position.
///
/// Returns the number of bytes written. An empty payload produces an empty run.
#[instrument(skip(writer, data), fields(size = data.len()), err)]
pub fn write_chunks<W: Write + Seek>(
    writer: &mut W,
    data: &[u8],
    chunk_size: usize,
    level: Compression,
) -> Result<u64> {
    let mut written = 0u64;
    for raw in data.chunks(chunk_size.max(1)) {
        let compressed = deflate(raw, level)?;
        let header = ChunkHeader {
            compressed: u32::try_from(compressed.len())
                .map_err(|_| Error::TooLarge("compressed chunk"))?,
            decompressed: u32::try_from(raw.len()).map_err(|_| Error::TooLarge("chunk"))?,
        };
        trace!(
            compressed = header.compressed,
            decompressed = header.decompressed,
            "writing chunk"
        );

        header.write(writer)?;
        writer.write_all(&compressed)?;
        written += 8 + compressed.len() as u64;
    }
    Ok(written)
}

/// Read chunks from the current position until `size` inflated bytes have been collected.
///
/// Fails with [`Error::TruncatedStream`] if the stream ends first and with
/// [`Error::ChunkOverrun`] if a chunk would carry the run past `size`.
#[instrument(skip(reader), err)]
pub fn read_chunks<R: Read + Seek>(reader: &mut R, size: u32) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(size as usize);
    let mut total = 0u64;

    while total < u64::from(size) {
        let header = ChunkHeader::read(reader).map_err(Error::from)?;
        total += u64::from(header.decompressed);
        if total > u64::from(size) {
            return Err(Error::ChunkOverrun {
                expected: size,
                actual: total,
            });
        }

        let mut compressed = vec![0u8; header.compressed as usize];
        reader
            .read_exact(&mut compressed)
            .map_err(|e| eof_as_truncated(e.into()))?;
        trace!(
            compressed = header.compressed,
            decompressed = header.decompressed,
            "read chunk"
        );

        inflate_into(&compressed, header.decompressed, &mut data)?;
    }

    Ok(data)
}

fn deflate(data: &[u8], level: Compression) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), level);
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn inflate_into(compressed: &[u8], expected: u32, out: &mut Vec<u8>) -> Result<()> {
    let start = out.len();
    ZlibDecoder::new(compressed)
        .take(u64::from(expected) + 1)
        .read_to_end(out)
        .map_err(|e| Error::DecompressionFailure(e.to_string()))?;

    let inflated = out.len() - start;
    if inflated != expected as usize {
        return Err(Error::DecompressionFailure(format!(
            "chunk inflated to {inflated} bytes, header declares {expected}"
        )));
    }
    Ok(())
}

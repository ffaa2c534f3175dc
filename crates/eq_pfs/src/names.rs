//! The name blob: the synthetic entry mapping directory hashes back to names.
//!
//! Its inflated content is a `u32` name count followed by, for each name, a `u32` length that
//! includes a trailing NUL and the NUL-terminated name bytes.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{eof_as_truncated, Error, Result};
use crate::hash::filename_hash;

/// Serialize `names` into a name blob
pub fn encode_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<u8>> {
    let mut blob = Vec::new();
    blob.write_u32::<LittleEndian>(
        u32::try_from(names.len()).map_err(|_| Error::TooLarge("name count"))?,
    )?;
    for name in names {
        let name = name.as_ref();
        let len = u32::try_from(name.len() + 1).map_err(|_| Error::TooLarge("name length"))?;
        blob.write_u32::<LittleEndian>(len)?;
        blob.write_all(name.as_bytes())?;
        blob.write_u8(0)?;
    }
    Ok(blob)
}

/// The count a name blob declares in its first four bytes, if it has four bytes
pub fn declared_count(blob: &[u8]) -> Option<u32> {
    let prefix: [u8; 4] = blob.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(prefix))
}

/// Parse a name blob back into its names, in stored order
pub fn decode_names(blob: &[u8]) -> Result<Vec<String>> {
    read_names(&mut Cursor::new(blob)).map_err(eof_as_truncated)
}

fn read_names<R: Read>(reader: &mut R) -> Result<Vec<String>> {
    let count = reader.read_u32::<LittleEndian>()?;
    let mut names = Vec::new();
    for _ in 0..count {
        let len = reader.read_u32::<LittleEndian>()? as usize;
        let mut raw = Vec::new();
        reader.by_ref().take(len as u64).read_to_end(&mut raw)?;
        if raw.len() != len {
            return Err(Error::TruncatedStream);
        }
        if raw.last() == Some(&0) {
            raw.pop();
        }
        names.push(String::from_utf8_lossy(&raw).into_owned());
    }
    Ok(names)
}

/// Lookup table from directory hash to entry name
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NameTable {
    names: HashMap<u32, String>,
}

impl NameTable {
    /// Hash every name into a lookup table
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names: names
                .into_iter()
                .map(|name| (filename_hash(&name), name))
                .collect(),
        }
    }

    /// The name whose hash is `hash`
    pub fn get(&self, hash: u32) -> Option<&str> {
        self.names.get(&hash).map(String::as_str)
    }

    /// Number of distinct hashes in the table
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table holds no names
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

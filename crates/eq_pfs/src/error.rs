//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(binrw::Error),

    /// the header does not start with `PFS `
    #[error("file is not a pfs archive, found magic {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// the header carries a version this library does not read
    #[error("unsupported pfs version {0:#010x}")]
    #[diagnostic(help("only version 0x00020000 archives are supported"))]
    UnsupportedVersion(u32),

    /// the stream ended before a chunk run or the footer was complete
    #[error("stream ended before the expected data was read")]
    TruncatedStream,

    /// a chunk run decompressed to more bytes than its directory record declares
    #[error("chunk run decompressed to {actual} bytes, directory declares {expected}")]
    ChunkOverrun {
        /// size taken from the directory record
        expected: u32,
        /// running total when the overrun was detected
        actual: u64,
    },

    /// no directory record starts at the current data region position
    #[error("data chunk at {position:#x} has no matching directory record")]
    #[diagnostic(help("the directory is corrupt or was edited by hand"))]
    OffsetMismatch {
        /// absolute stream position of the unmatched chunk run
        position: u64,
    },

    /// a payload hash has no entry in the name blob
    #[error("name not found for hash {hash:#010x}")]
    NameNotFound {
        /// directory hash of the orphaned payload
        hash: u32,
    },

    /// an entry with this name already exists
    #[error("an entry named {0} already exists")]
    DuplicateName(String),

    /// two distinct names share a filename hash and could not be told apart on decode
    #[error("{name} has the same filename hash ({hash:#010x}) as {existing}")]
    HashCollision {
        /// name being added
        name: String,
        /// entry already holding the hash
        existing: String,
        /// the shared hash
        hash: u32,
    },

    /// the name cannot be stored in the name blob
    #[error("invalid entry name {0:?}")]
    InvalidName(String),

    /// unable to find requested file
    #[error("unable to find requested file {0}")]
    EntryNotFound(String),

    /// a chunk failed to inflate
    #[error("failed to decompress chunk: {0}")]
    DecompressionFailure(String),

    /// the footer is present but its magic or marker are wrong
    #[error("invalid footer: {0}")]
    InvalidFooter(String),

    /// a position or size does not fit the format's 32-bit fields
    #[error("{0} exceeds the 32-bit limit of the pfs format")]
    TooLarge(&'static str),

    /// an error raised while handling a specific entry
    #[error("{name}: {source}")]
    InFile {
        /// name of the entry being processed
        name: String,
        /// the underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the name of the entry it occurred on
    pub fn in_file(self, name: impl ToString) -> Self {
        Error::InFile {
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// Strip any [`Error::InFile`] context, returning the underlying error kind
    pub fn root(&self) -> &Error {
        match self {
            Error::InFile { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the underlying error is [`Error::TruncatedStream`]
    pub fn is_truncated(&self) -> bool {
        matches!(self.root(), Error::TruncatedStream)
    }
}

impl From<binrw::Error> for Error {
    fn from(value: binrw::Error) -> Self {
        if value.is_eof() {
            return Error::TruncatedStream;
        }
        match value {
            binrw::Error::Io(e) => Error::from(e),
            other => Error::BinRWError(other),
        }
    }
}

/// Map an unexpected end of file onto [`Error::TruncatedStream`]
pub(crate) fn eof_as_truncated(error: Error) -> Error {
    match error {
        Error::IOError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Error::TruncatedStream
        }
        other => other,
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;

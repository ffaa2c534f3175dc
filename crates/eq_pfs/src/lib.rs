//! This library handles reading from and creating **PFS** archives used by *EverQuest*.
//!
//! # PFS Archive Format Documentation
//!
//! PFS is the container behind `.eqg`, `.s3d`, `.pfs` and `.pak` files. It stores a flat set of
//! named files, each compressed as a run of independent zlib chunks, and identifies them in its
//! directory by a hash of their name rather than the name itself.
//!
//! ## File Structure
//!
//! A PFS file consists of a header, the data region, the directory and an optional footer.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Directory Offset       | 4 bytes: Absolute offset of the directory                  |
//! | 0x0004         | Magic number           | 4 bytes: 0x50465320 ("PFS ")                               |
//! | 0x0008         | Version                | 4 bytes: Fixed value 0x00020000                            |
//! | 0x000C         | Data Region            | Chunk runs of every file, then the name blob               |
//! | Dir. Offset    | Directory              | Record count followed by the records                       |
//! | Dir. End       | Footer                 | 21 bytes, absent in some older archives                    |
//!
//! ### Data Region
//!
//! Every file is stored as a run of chunks. A chunk is an 8 byte header followed by a complete
//! zlib stream:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Compressed Size        | 4 bytes: Number of zlib bytes that follow               |
//! | 0x0004         | Uncompressed Size      | 4 bytes: Number of bytes the chunk inflates to          |
//! | 0x0008         | Data                   | Compressed Size bytes of zlib data                      |
//!
//! Runs carry no terminator. A reader keeps inflating chunks until it has collected the size
//! found in the directory record. Empty files have no chunks at all.
//!
//! ### Name Blob
//!
//! The last run of the data region is the name blob. Once inflated it holds a 4 byte name
//! count followed by, for each file, a 4 byte length (including the terminator) and the
//! NUL-terminated name. Its directory record uses `0x61580AC9` as its hash.
//!
//! ### Directory
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Filename Hash          | 4 bytes: [`filename_hash`] of the file name             |
//! | 0x0004         | Data Offset            | 4 bytes: Absolute offset of the first chunk             |
//! | 0x0008         | Size                   | 4 bytes: Total uncompressed size                        |
//!
//! Records are sorted ascending by hash and the name blob has a record of its own, so the count
//! is always one more than the number of files.
//!
//! ### Footer
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Magic                  | 4 bytes: 0x61580AC9                                     |
//! | 0x0004         | Name Blob Offset       | 4 bytes: Offset of the name blob's chunk run            |
//! | 0x0008         | Name Blob Size         | 4 bytes: Uncompressed size of the name blob             |
//! | 0x000C         | Marker                 | 5 bytes: "STEVE"                                        |
//! | 0x0011         | Timestamp              | 4 bytes: Unix time the archive was written              |
//!
//! Only this 21 byte layout is read. Some older tools wrote just the marker and timestamp
//! (9 bytes) after the directory; such archives fail to decode with
//! [`error::Error::TruncatedStream`].
//!
//! ## Additional Information
//!
//! - **File Extensions**: `.eqg`, `.s3d`, `.pfs`, `.pak`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Compression**: zlib, one stream per chunk
//!

pub mod archive;
pub mod compression;
pub mod error;
pub mod hash;
pub mod names;
pub mod read;
pub mod types;
pub mod write;

pub use archive::{ArchiveEntry, PfsArchive};
pub use hash::filename_hash;
pub use read::PfsReader;
pub use write::{PfsWriter, PfsWriterOptions};

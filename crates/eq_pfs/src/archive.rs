//! The in-memory archive: a set of named byte blobs that can be encoded to and decoded from
//! the PFS layout.

use indexmap::IndexMap;
use std::{
    fs::{self, File},
    io::{BufReader, Read, Seek, Write},
    path::{Component, Path},
};
use tracing::{debug, info, instrument};

use crate::{
    error::{Error, Result},
    hash::{filename_hash, same_name},
    read::PfsReader,
    types::PfsFooter,
    write::{PfsWriter, PfsWriterOptions},
};

/// A random access byte source an archive can be decoded from
///
/// Decoding jumps to the directory before walking the data, so plain streams do not qualify.
pub trait ArchiveSource: Read + Seek {}

impl<T: Read + Seek + ?Sized> ArchiveSource for T {}

/// A random access byte sink an archive can be encoded into
///
/// Encoding patches the header after everything else has been written, so plain streams do
/// not qualify.
pub trait ArchiveSink: Write + Seek {}

impl<T: Write + Seek + ?Sized> ArchiveSink for T {}

/// A named file stored in an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    name: String,
    hash: u32,
    data: Vec<u8>,
}

impl ArchiveEntry {
    /// Create an entry, computing the hash of its name
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        Self {
            hash: filename_hash(&name),
            name,
            data: data.into(),
        }
    }

    /// Name of the entry, with its case preserved
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The directory hash of [`ArchiveEntry::name`]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Contents of the entry
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the contents out of the entry
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// A PFS archive (`.eqg`, `.s3d`, `.pfs`) held in memory
///
/// ```
/// # fn doit() -> eq_pfs::error::Result<()>
/// # {
/// use std::io::Cursor;
/// use eq_pfs::PfsArchive;
///
/// let mut archive = PfsArchive::new("example.eqg");
/// archive.add("hello.txt", b"Hello, World!".to_vec())?;
///
/// let mut buffer = Cursor::new(Vec::new());
/// archive.encode(&mut buffer)?;
///
/// let mut decoded = PfsArchive::new("copy.eqg");
/// decoded.decode(&mut buffer)?;
/// assert_eq!(decoded.file("hello.txt")?, b"Hello, World!");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct PfsArchive {
    name: String,
    files: IndexMap<u32, ArchiveEntry>,
    footer: Option<PfsFooter>,
}

impl PfsArchive {
    /// Create an empty archive. The name is only used for display and is never written.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Read the archive stored at `path`
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut archive = Self::new(name);
        archive.decode(&mut BufReader::new(File::open(path)?))?;
        Ok(archive)
    }

    /// Display name of the archive
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of files in the archive
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the archive holds no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        let (index, _, entry) = self.files.get_full(&filename_hash(name))?;
        same_name(entry.name(), name).then_some(index)
    }

    /// Whether a file with this name exists. Names are matched ignoring ASCII case and
    /// treating `\` and `/` alike, the way the directory hash does.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Add a new file.
    ///
    /// Fails if a file with the same name (ignoring case and separators) exists, or if a
    /// different name hashes to the same directory hash since the two could not be told
    /// apart once written.
    pub fn add(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<()> {
        let entry = ArchiveEntry::new(name, data);
        validate_name(entry.name())?;

        if let Some(existing) = self.files.get(&entry.hash()) {
            if same_name(existing.name(), entry.name()) {
                return Err(Error::DuplicateName(entry.name));
            }
            return Err(Error::HashCollision {
                hash: entry.hash(),
                existing: existing.name().to_owned(),
                name: entry.name,
            });
        }

        debug!(name = entry.name(), size = entry.data().len(), "adding file");
        self.files.insert(entry.hash(), entry);
        Ok(())
    }

    /// Replace the contents of a file, adding it if it does not exist yet.
    ///
    /// An existing file keeps the name it was added with.
    pub fn set_file(&mut self, name: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        match self.index_of(name) {
            Some(index) => {
                if let Some((_, entry)) = self.files.get_index_mut(index) {
                    entry.data = data.into();
                }
                Ok(())
            }
            None => self.add(name, data),
        }
    }

    /// Remove a file, returning it if it was present
    pub fn remove(&mut self, name: &str) -> Option<ArchiveEntry> {
        let index = self.index_of(name)?;
        self.files.shift_remove_index(index).map(|(_, entry)| entry)
    }

    /// Contents of the file called `name`
    pub fn file(&self, name: &str) -> Result<&[u8]> {
        self.index_of(name)
            .and_then(|index| self.files.get_index(index))
            .map(|(_, entry)| entry.data())
            .ok_or_else(|| Error::EntryNotFound(name.to_owned()))
    }

    /// Every file in the archive
    pub fn files(&self) -> impl ExactSizeIterator<Item = &ArchiveEntry> {
        self.files.values()
    }

    /// Sum of the uncompressed sizes of all files
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|e| e.data().len() as u64).sum()
    }

    /// The footer found by the last [`PfsArchive::decode`], if the archive had one
    pub fn footer(&self) -> Option<&PfsFooter> {
        self.footer.as_ref()
    }

    /// Write the archive with default options
    pub fn encode<W: ArchiveSink>(&self, writer: &mut W) -> Result<()> {
        self.encode_with(writer, PfsWriterOptions::default())
    }

    /// Write the archive.
    ///
    /// The archive is rebuilt from scratch at the start of the writer, overwriting whatever
    /// it held there.
    #[instrument(skip(self, writer), fields(archive = %self.name, files = self.len()), err)]
    pub fn encode_with<W: ArchiveSink>(
        &self,
        writer: &mut W,
        options: PfsWriterOptions,
    ) -> Result<()> {
        PfsWriter::new(writer, options).write(self.files.values())?;
        Ok(())
    }

    /// Replace the contents of this archive with the archive read from `reader`.
    ///
    /// Nothing is changed if decoding fails.
    #[instrument(skip(self, reader), fields(archive = %self.name), err)]
    pub fn decode<R: ArchiveSource>(&mut self, reader: &mut R) -> Result<()> {
        let contents = PfsReader::new(reader).read()?;

        let mut files = IndexMap::with_capacity(contents.entries.len());
        for entry in contents.entries {
            if files.contains_key(&entry.hash()) {
                return Err(Error::DuplicateName(entry.name));
            }
            files.insert(entry.hash(), entry);
        }

        self.files = files;
        self.footer = contents.footer;
        Ok(())
    }

    /// Write every file below `directory`, creating any missing directories.
    ///
    /// `\` in names is treated as a path separator. Names that would escape `directory`
    /// (absolute paths, `..`) are rejected.
    #[instrument(skip(self, directory), fields(directory = %directory.as_ref().display()), err)]
    pub fn extract(&self, directory: impl AsRef<Path>) -> Result<usize> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory)?;

        for entry in self.files.values() {
            let name = entry.name().replace('\\', "/");
            let relative = Path::new(&name);
            if !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(Error::InvalidName(entry.name().to_owned()));
            }

            let path = directory.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            info!("writing {}", path.display());
            fs::write(&path, entry.data()).map_err(|e| Error::from(e).in_file(entry.name()))?;
        }

        Ok(self.files.len())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidName(name.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use tracing_test::traced_test;

    use super::{ArchiveEntry, PfsArchive};
    use crate::error::{Error, Result};
    use crate::hash::filename_hash;
    use crate::write::PfsWriterOptions;

    #[test]
    fn add_and_lookup() -> Result<()> {
        let mut archive = PfsArchive::new("test.eqg");
        archive.add("a.txt", b"hi".to_vec())?;

        assert_eq!(archive.name(), "test.eqg");
        assert_eq!(archive.len(), 1);
        assert!(archive.contains("a.txt"));
        assert_eq!(archive.file("a.txt")?, b"hi");

        Ok(())
    }

    #[test]
    fn add_duplicate_is_rejected() -> Result<()> {
        let mut archive = PfsArchive::new("test.eqg");
        archive.add("x.txt", b"first".to_vec())?;

        let result = archive.add("x.txt", b"second".to_vec());
        assert!(matches!(result, Err(Error::DuplicateName(name)) if name == "x.txt"));
        assert_eq!(archive.file("x.txt")?, b"first");
        assert_eq!(archive.len(), 1);

        Ok(())
    }

    #[test]
    fn add_folded_duplicate_is_rejected() -> Result<()> {
        let mut archive = PfsArchive::new("test.eqg");
        archive.add("Textures/Stone.DDS", b"first".to_vec())?;

        let result = archive.add("textures\\stone.dds", b"second".to_vec());
        assert!(matches!(result, Err(Error::DuplicateName(_))));
        assert_eq!(archive.file("Textures/Stone.DDS")?, b"first");

        Ok(())
    }

    #[test]
    fn add_hash_collision_is_rejected() -> Result<()> {
        let mut archive = PfsArchive::new("test.eqg");
        archive.add("5h2v24c3.dat", b"first".to_vec())?;

        let result = archive.add("c6cad3au.dat", b"second".to_vec());
        assert!(matches!(
            result,
            Err(Error::HashCollision { ref existing, hash, .. })
                if existing == "5h2v24c3.dat" && hash == filename_hash("c6cad3au.dat")
        ));

        // A colliding name must not resolve to the stored file either
        assert!(!archive.contains("c6cad3au.dat"));
        assert!(matches!(
            archive.file("c6cad3au.dat"),
            Err(Error::EntryNotFound(_))
        ));
        assert!(archive.remove("c6cad3au.dat").is_none());
        assert_eq!(archive.len(), 1);

        Ok(())
    }

    #[test]
    fn lookups_ignore_case_and_separators() -> Result<()> {
        let mut archive = PfsArchive::new("test.eqg");
        archive.add("Textures/Stone.DDS", b"stone".to_vec())?;

        assert!(archive.contains("textures/stone.dds"));
        assert_eq!(archive.file("textures\\stone.dds")?, b"stone");

        archive.set_file("textures/stone.dds", b"granite".to_vec())?;
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.file("Textures/Stone.DDS")?, b"granite");
        assert_eq!(
            archive.files().map(ArchiveEntry::name).collect::<Vec<_>>(),
            vec!["Textures/Stone.DDS"]
        );

        let removed = archive.remove("TEXTURES/STONE.DDS");
        assert_eq!(removed.as_ref().map(ArchiveEntry::name), Some("Textures/Stone.DDS"));
        assert!(archive.is_empty());

        Ok(())
    }

    #[test]
    fn add_invalid_names() {
        let mut archive = PfsArchive::new("test.eqg");

        assert!(matches!(
            archive.add("", Vec::<u8>::new()),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            archive.add("a\0b", Vec::<u8>::new()),
            Err(Error::InvalidName(_))
        ));
        assert!(archive.is_empty());
    }

    #[test]
    fn missing_file() {
        let archive = PfsArchive::new("test.eqg");

        let result = archive.file("missing.txt");
        assert!(matches!(result, Err(Error::EntryNotFound(name)) if name == "missing.txt"));
    }

    #[test]
    fn remove_and_set() -> Result<()> {
        let mut archive = PfsArchive::new("test.eqg");
        archive.add("a.txt", b"hi".to_vec())?;

        assert!(archive.remove("missing.txt").is_none());
        assert_eq!(
            archive.remove("a.txt"),
            Some(ArchiveEntry::new("a.txt", b"hi".to_vec()))
        );
        assert!(archive.is_empty());

        archive.set_file("a.txt", b"one".to_vec())?;
        archive.set_file("a.txt", b"two".to_vec())?;
        assert_eq!(archive.file("a.txt")?, b"two");
        assert_eq!(archive.total_size(), 3);

        Ok(())
    }

    #[traced_test]
    #[test]
    fn decode_replaces_contents() -> Result<()> {
        let mut source = PfsArchive::new("source.eqg");
        source.add("a.txt", b"hi".to_vec())?;
        source.add("b/c.dat", vec![0x00u8, 0x01, 0x02, 0x03])?;

        let mut buffer = Cursor::new(Vec::new());
        source.encode_with(
            &mut buffer,
            PfsWriterOptions::builder().timestamp(1_700_000_000).build(),
        )?;

        let mut target = PfsArchive::new("target.eqg");
        target.add("stale.txt", b"old".to_vec())?;
        target.decode(&mut buffer)?;

        assert_eq!(target.len(), 2);
        assert!(!target.contains("stale.txt"));
        assert_eq!(target.file("a.txt")?, b"hi");
        assert_eq!(target.file("b/c.dat")?, &[0x00u8, 0x01, 0x02, 0x03]);
        assert_eq!(
            target.files().map(ArchiveEntry::name).collect::<Vec<_>>(),
            vec!["b/c.dat", "a.txt"]
        );
        assert_eq!(target.footer().map(|f| f.timestamp), Some(1_700_000_000));

        Ok(())
    }

    #[test]
    fn failed_decode_keeps_contents() -> Result<()> {
        let mut archive = PfsArchive::new("test.eqg");
        archive.add("a.txt", b"hi".to_vec())?;

        let result = archive.decode(&mut Cursor::new(vec![0u8; 4]));
        assert!(result.is_err());
        assert_eq!(archive.file("a.txt")?, b"hi");

        Ok(())
    }
}

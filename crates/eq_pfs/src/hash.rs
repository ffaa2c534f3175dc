//! Filename hashing used to key directory records.
//!
//! PFS archives identify entries by a CRC-32 of the entry's name instead of storing the name
//! next to the record. The variant used is the plain MSB-first CRC with polynomial
//! `0x04C11DB7`, a zero initial value and no final xor, fed the normalized name followed by
//! its NUL terminator.
//!
//! The hash decides the physical order of entries inside an archive, so it must never change.

use crc::{Algorithm, Crc};

/// CRC parameters of the PFS filename hash
pub const PFS_FILENAME: Algorithm<u32> = Algorithm {
    width: 32,
    poly: 0x04c1_1db7,
    init: 0x0000_0000,
    refin: false,
    refout: false,
    xorout: 0x0000_0000,
    check: 0x89a1_897f,
    residue: 0x0000_0000,
};

const FILENAME_CRC: Crc<u32> = Crc::<u32>::new(&PFS_FILENAME);

/// Hash an entry name the way the directory stores it.
///
/// Names are compared case-insensitively and with either path separator by the game, so the
/// name is lowercased (ASCII only) and `\` is folded to `/` before hashing.
pub fn filename_hash(name: &str) -> u32 {
    let mut digest = FILENAME_CRC.digest();
    for byte in name.bytes() {
        digest.update(&[normalize(byte)]);
    }
    digest.update(&[0]);
    digest.finalize()
}

/// Whether two names refer to the same entry once case and path separators are folded
pub fn same_name(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .all(|(x, y)| normalize(x) == normalize(y))
}

fn normalize(byte: u8) -> u8 {
    match byte {
        b'\\' => b'/',
        other => other.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{filename_hash, same_name, FILENAME_CRC};

    #[test]
    fn known_hashes() {
        assert_eq!(filename_hash("test"), 1537663841);
        assert_eq!(filename_hash("hello world"), 2533725502);
        assert_eq!(filename_hash("12345"), 742322399);
        assert_eq!(filename_hash("test.txt"), 2138351979);
    }

    #[test]
    fn check_value() {
        assert_eq!(FILENAME_CRC.checksum(b"123456789"), 0x89a1_897f);
    }

    #[test]
    fn case_and_separator_are_folded() {
        assert_eq!(filename_hash("Test.TXT"), filename_hash("test.txt"));
        assert_eq!(filename_hash("b\\c.dat"), filename_hash("b/c.dat"));
        assert_ne!(filename_hash("a.txt"), filename_hash("b.txt"));
    }

    #[test]
    fn folded_names_match() {
        assert!(same_name("Textures\\Stone.DDS", "textures/stone.dds"));
        assert!(!same_name("textures/stone.dds", "textures/stone.dd"));
        assert!(!same_name("5h2v24c3.dat", "c6cad3au.dat"));
    }

    #[test]
    fn distinct_names_can_collide() {
        assert_eq!(filename_hash("5h2v24c3.dat"), 0x96d0_db82);
        assert_eq!(filename_hash("c6cad3au.dat"), 0x96d0_db82);
    }
}

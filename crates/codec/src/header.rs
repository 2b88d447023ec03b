//! File-level headers shared by the `.dat` and `.idx` files.
use crate::{
    pack_description, read_u32, read_u64, write_u32, write_u64, DATA_MAGIC, DESCRIPTION_LEN,
    FORMAT_VERSION,
};
use std::io::{self, Read, Write};

/// The fixed-size header at the start of `<name>.dat`.
///
/// Layout: `{ magic: u64, version: u32, description: [u8; 128], milestone: u64 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFileHeader {
    pub magic: u64,
    pub version: u32,
    pub description: [u8; DESCRIPTION_LEN],
    pub milestone: u64,
}

impl DataFileHeader {
    /// Builds a fresh header for a newly created data file, with the
    /// milestone slot zeroed.
    pub fn new(description: &str) -> Self {
        Self {
            magic: DATA_MAGIC,
            version: FORMAT_VERSION,
            description: pack_description(description),
            milestone: 0,
        }
    }

    /// `true` if the magic number and format version are ones this build
    /// understands.
    pub fn is_valid(&self) -> bool {
        self.magic == DATA_MAGIC && self.version == FORMAT_VERSION
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_u64(w, self.magic)?;
        write_u32(w, self.version)?;
        w.write_all(&self.description)?;
        write_u64(w, self.milestone)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let magic = read_u64(r)?;
        let version = read_u32(r)?;
        let mut description = [0u8; DESCRIPTION_LEN];
        r.read_exact(&mut description)?;
        let milestone = read_u64(r)?;
        Ok(Self {
            magic,
            version,
            description,
            milestone,
        })
    }
}

/// The fixed-size header at the start of `<name>.idx`.
///
/// Layout: `{ magic: u64, version: u32, description: [u8; 128] }` — same
/// magic and format version as the data file, no milestone field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexFileHeader {
    pub magic: u64,
    pub version: u32,
    pub description: [u8; DESCRIPTION_LEN],
}

impl IndexFileHeader {
    pub fn new(description: &str) -> Self {
        Self {
            magic: DATA_MAGIC,
            version: FORMAT_VERSION,
            description: pack_description(description),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == DATA_MAGIC && self.version == FORMAT_VERSION
    }

    /// `true` if this index header's format is compatible with `data`'s.
    pub fn matches_data(&self, data: &DataFileHeader) -> bool {
        self.magic == data.magic && self.version == data.version
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_u64(w, self.magic)?;
        write_u32(w, self.version)?;
        w.write_all(&self.description)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let magic = read_u64(r)?;
        let version = read_u32(r)?;
        let mut description = [0u8; DESCRIPTION_LEN];
        r.read_exact(&mut description)?;
        Ok(Self {
            magic,
            version,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn data_header_round_trips() {
        let mut h = DataFileHeader::new(crate::DEFAULT_DATA_DESCRIPTION);
        h.milestone = 42;

        let mut buf = Vec::new();
        h.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), crate::DATA_HEADER_SIZE as usize);

        let back = DataFileHeader::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(h, back);
        assert!(back.is_valid());
    }

    #[test]
    fn index_header_round_trips_and_matches_data() {
        let data = DataFileHeader::new(crate::DEFAULT_DATA_DESCRIPTION);
        let idx = IndexFileHeader::new(crate::DEFAULT_INDEX_DESCRIPTION);

        let mut buf = Vec::new();
        idx.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), crate::INDEX_HEADER_SIZE as usize);

        let back = IndexFileHeader::read_from(&mut Cursor::new(buf)).unwrap();
        assert!(back.matches_data(&data));
    }

    #[test]
    fn bad_magic_is_invalid() {
        let mut h = DataFileHeader::new("x");
        h.magic ^= 1;
        assert!(!h.is_valid());
    }
}

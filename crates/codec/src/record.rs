//! On-disk record layouts for data and index files.
use crate::{read_u32, read_u64, write_u32, write_u64, IncrementalCrc};
use std::io::{self, Read, Write};

/// Fixed header preceding every data record's metadata and data bytes.
///
/// Layout: `{ seqnum: u64, timestamp: u64, metadata_len: u32, data_len: u32,
/// checksum: u32 }`. The checksum covers every other field of this header
/// plus the metadata and data bytes that follow, in that order — the
/// checksum field itself is excluded from the bytes it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRecordHeader {
    pub seqnum: u64,
    pub timestamp: u64,
    pub metadata_len: u32,
    pub data_len: u32,
    pub checksum: u32,
}

impl DataRecordHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_u64(w, self.seqnum)?;
        write_u64(w, self.timestamp)?;
        write_u32(w, self.metadata_len)?;
        write_u32(w, self.data_len)?;
        write_u32(w, self.checksum)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let seqnum = read_u64(r)?;
        let timestamp = read_u64(r)?;
        let metadata_len = read_u32(r)?;
        let data_len = read_u32(r)?;
        let checksum = read_u32(r)?;
        Ok(Self {
            seqnum,
            timestamp,
            metadata_len,
            data_len,
            checksum,
        })
    }

    /// Computes the checksum that *should* cover this header (sans its own
    /// checksum field) concatenated with `metadata` then `data`.
    pub fn compute_checksum(
        seqnum: u64,
        timestamp: u64,
        metadata_len: u32,
        data_len: u32,
        metadata: &[u8],
        data: &[u8],
    ) -> u32 {
        let mut crc = IncrementalCrc::new();
        crc.update(&seqnum.to_le_bytes());
        crc.update(&timestamp.to_le_bytes());
        crc.update(&metadata_len.to_le_bytes());
        crc.update(&data_len.to_le_bytes());
        crc.update(metadata);
        crc.update(data);
        crc.finalize()
    }

    /// `true` if `self.checksum` matches the checksum recomputed over
    /// `metadata` and `data`.
    pub fn verify(&self, metadata: &[u8], data: &[u8]) -> bool {
        self.checksum
            == Self::compute_checksum(
                self.seqnum,
                self.timestamp,
                self.metadata_len,
                self.data_len,
                metadata,
                data,
            )
    }
}

/// A fixed-size `{ seqnum: u64, timestamp: u64, offset: u64 }` triple stored
/// in the index file, one per data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRecord {
    pub seqnum: u64,
    pub timestamp: u64,
    pub offset: u64,
}

impl IndexRecord {
    /// `true` if every field is zero — the sentinel for "unwritten slot"
    /// used throughout recovery to detect the tail of the index.
    pub fn is_zero(&self) -> bool {
        self.seqnum == 0 && self.timestamp == 0 && self.offset == 0
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_u64(w, self.seqnum)?;
        write_u64(w, self.timestamp)?;
        write_u64(w, self.offset)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let seqnum = read_u64(r)?;
        let timestamp = read_u64(r)?;
        let offset = read_u64(r)?;
        Ok(Self {
            seqnum,
            timestamp,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn data_record_header_round_trips() {
        let metadata = b"md";
        let data = b"payload bytes";
        let checksum =
            DataRecordHeader::compute_checksum(7, 100, metadata.len() as u32, data.len() as u32, metadata, data);
        let h = DataRecordHeader {
            seqnum: 7,
            timestamp: 100,
            metadata_len: metadata.len() as u32,
            data_len: data.len() as u32,
            checksum,
        };

        let mut buf = Vec::new();
        h.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), crate::DATA_RECORD_HEADER_SIZE as usize);

        let back = DataRecordHeader::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(h, back);
        assert!(back.verify(metadata, data));
    }

    #[test]
    fn checksum_detects_corruption() {
        let metadata = b"md";
        let data = b"payload";
        let checksum =
            DataRecordHeader::compute_checksum(1, 1, metadata.len() as u32, data.len() as u32, metadata, data);
        let h = DataRecordHeader {
            seqnum: 1,
            timestamp: 1,
            metadata_len: metadata.len() as u32,
            data_len: data.len() as u32,
            checksum,
        };
        assert!(!h.verify(b"md", b"corrupted"));
    }

    #[test]
    fn index_record_round_trips_and_zero_sentinel() {
        let r = IndexRecord {
            seqnum: 3,
            timestamp: 9,
            offset: 4096,
        };
        let mut buf = Vec::new();
        r.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), crate::INDEX_RECORD_SIZE as usize);
        let back = IndexRecord::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(r, back);
        assert!(!back.is_zero());
        assert!(IndexRecord::default().is_zero());
    }
}

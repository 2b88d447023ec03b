//! # codec
//!
//! Fixed-layout binary encoding for ledgerdb's paired data/index files, and
//! the CRC-32 (AUTODIN-II / zlib polynomial) checksum used to detect torn or
//! corrupted records.
//!
//! Every integer on the wire is little-endian, chosen once here so the file
//! format is portable across host architectures.
//!
//! ## Layout
//!
//! ```text
//! <name>.dat: [data header][record0][meta0][data0][record1]...  [zero padding]
//! <name>.idx: [index header][idx0][idx1]...                     [zero padding]
//! ```
//!
//! Data record header: `{ seqnum: u64, timestamp: u64, metadata_len: u32,
//! data_len: u32, checksum: u32 }`. The checksum covers seqnum, timestamp,
//! metadata_len, data_len, metadata bytes, and data bytes, in that order —
//! the checksum field itself is excluded from the bytes it covers.
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{self, Read, Write};

mod crc;
mod header;
mod record;

pub use crc::{crc32_of, IncrementalCrc};
pub use header::{DataFileHeader, IndexFileHeader};
pub use record::{DataRecordHeader, IndexRecord};

/// Magic number identifying a ledgerdb data file: `0x211ABF1A62646C00`.
pub const DATA_MAGIC: u64 = 0x211A_BF1A_6264_6C00;

/// On-disk format version understood by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Length in bytes of the human-readable ASCII description blob carried in
/// both file headers. A multiple of 8 for alignment.
pub const DESCRIPTION_LEN: usize = 128;

/// Total size in bytes of the data file header: magic + version + blob +
/// milestone.
pub const DATA_HEADER_SIZE: u64 = 8 + 4 + DESCRIPTION_LEN as u64 + 8;

/// Total size in bytes of the index file header: magic + version + blob
/// (no milestone field).
pub const INDEX_HEADER_SIZE: u64 = 8 + 4 + DESCRIPTION_LEN as u64;

/// Fixed size in bytes of a data record header (excludes metadata/data
/// payload bytes that follow it on disk).
pub const DATA_RECORD_HEADER_SIZE: u64 = 8 + 8 + 4 + 4 + 4;

/// Fixed size in bytes of one index record.
pub const INDEX_RECORD_SIZE: u64 = 8 + 8 + 8;

/// Description blob stamped into freshly created data files.
pub const DEFAULT_DATA_DESCRIPTION: &str = "ledgerdb data file";

/// Description blob stamped into freshly created index files.
pub const DEFAULT_INDEX_DESCRIPTION: &str = "ledgerdb index file";

/// Pads or truncates `text` into a fixed-size, NUL-padded ASCII blob.
pub fn pack_description(text: &str) -> [u8; DESCRIPTION_LEN] {
    let mut out = [0u8; DESCRIPTION_LEN];
    let bytes = text.as_bytes();
    let n = bytes.len().min(DESCRIPTION_LEN);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Computes the on-disk byte size of a fully-formed data record (header +
/// metadata + data), used to derive the next record's offset.
pub fn record_on_disk_size(metadata_len: u32, data_len: u32) -> u64 {
    DATA_RECORD_HEADER_SIZE + metadata_len as u64 + data_len as u64
}

/// Writes `count` zero bytes to `w`.
pub fn write_zeros<W: Write>(w: &mut W, count: u64) -> io::Result<()> {
    const CHUNK: usize = 4096;
    let zeros = [0u8; CHUNK];
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(CHUNK as u64) as usize;
        w.write_all(&zeros[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

/// Reads a little-endian `u64`.
pub fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    r.read_u64::<LE>()
}

/// Writes a little-endian `u64`.
pub fn write_u64<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_u64::<LE>(v)
}

/// Reads a little-endian `u32`.
pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    r.read_u32::<LE>()
}

/// Writes a little-endian `u32`.
pub fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_u32::<LE>(v)
}

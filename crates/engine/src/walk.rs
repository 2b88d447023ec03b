//! Shared data-file and index-file walking primitives used by the
//! opener/recoverer.
use crate::file_pair::{try_read_exact, FilePair};
use codec::{record_on_disk_size, DataRecordHeader, IndexRecord, DATA_RECORD_HEADER_SIZE};
use config::StoreError;

/// The result of walking a contiguous run of data records starting at some
/// offset until either clean EOF, a torn/incomplete record, or a hard
/// invariant violation.
pub struct WalkOutcome {
    /// One index record per well-formed data record encountered, in order.
    pub records: Vec<IndexRecord>,
    /// Offset one past the last well-formed record (the new `data_end`
    /// candidate).
    pub end_offset: u64,
    /// `Some(offset)` if a torn/short/zero-seqnum tail record was found at
    /// `offset` — the caller should zeroise from there. This is not an
    /// error: it is the expected shape of a tail left by a crash mid-write.
    pub torn_at: Option<u64>,
}

/// Walks data records starting at `offset` until `file_len`, optionally
/// verifying checksums and requiring seqnum/timestamp continuity against
/// `prev_seqnum`/`prev_timestamp` (the record immediately preceding
/// `offset`, or `None` if `offset` is the very first record in the file).
///
/// A broken sequence, a decreasing timestamp, or (when `verify_checksum`)
/// a checksum mismatch on an otherwise well-sized record is a *hard*
/// violation and returns `Err`. A record that does
/// not fit in the remaining file length, or whose seqnum is zero, is
/// treated as an ordinary torn tail rather than an error.
pub fn walk_data_records(
    dat: &FilePair,
    mut offset: u64,
    file_len: u64,
    mut prev_seqnum: Option<u64>,
    mut prev_timestamp: Option<u64>,
    verify_checksum: bool,
) -> Result<WalkOutcome, StoreError> {
    let mut records = Vec::new();

    loop {
        if offset >= file_len {
            return Ok(WalkOutcome {
                records,
                end_offset: offset,
                torn_at: None,
            });
        }

        if offset + DATA_RECORD_HEADER_SIZE > file_len {
            return Ok(WalkOutcome {
                records,
                end_offset: offset,
                torn_at: Some(offset),
            });
        }

        let header = dat.with_reader(offset, DataRecordHeader::read_from)?;

        if header.seqnum == 0 {
            return Ok(WalkOutcome {
                records,
                end_offset: offset,
                torn_at: Some(offset),
            });
        }

        let rec_size = record_on_disk_size(header.metadata_len, header.data_len);
        if offset + rec_size > file_len {
            return Ok(WalkOutcome {
                records,
                end_offset: offset,
                torn_at: Some(offset),
            });
        }

        if let Some(ps) = prev_seqnum {
            if header.seqnum != ps + 1 {
                return Err(StoreError::FormatDat(format!(
                    "broken sequence at offset {offset}: expected seqnum {}, found {}",
                    ps + 1,
                    header.seqnum
                )));
            }
        }
        if let Some(pt) = prev_timestamp {
            if header.timestamp < pt {
                return Err(StoreError::FormatDat(format!(
                    "decreasing timestamp at offset {offset}: {} < {}",
                    header.timestamp, pt
                )));
            }
        }

        if verify_checksum {
            let (metadata, data) = dat.with_reader(offset + DATA_RECORD_HEADER_SIZE, |f| {
                let mut metadata = vec![0u8; header.metadata_len as usize];
                let mut data = vec![0u8; header.data_len as usize];
                if !try_read_exact(f, &mut metadata)? || !try_read_exact(f, &mut data)? {
                    return Ok(None);
                }
                Ok(Some((metadata, data)))
            })?;
            let (metadata, data) = match metadata {
                Some(pair) => pair,
                None => {
                    return Ok(WalkOutcome {
                        records,
                        end_offset: offset,
                        torn_at: Some(offset),
                    })
                }
            };
            if !header.verify(&metadata, &data) {
                return Err(StoreError::Checksum(header.seqnum));
            }
        }

        records.push(IndexRecord {
            seqnum: header.seqnum,
            timestamp: header.timestamp,
            offset,
        });
        prev_seqnum = Some(header.seqnum);
        prev_timestamp = Some(header.timestamp);
        offset += rec_size;
    }
}

/// Scans the index file backwards from its (record-aligned) end to find the
/// last non-zero index record, used by the fast (`check_on_open == false`)
/// open path that trusts the existing index rather than re-verifying it.
///
/// Returns the last valid record (if any) and the byte offset one past it
/// — the index's "used length" after backing off any partial trailing
/// record.
pub fn scan_index_tail_backwards(
    idx: &FilePair,
    header_size: u64,
) -> Result<(Option<IndexRecord>, u64), StoreError> {
    use codec::INDEX_RECORD_SIZE;

    let len = idx.len()?;
    if len <= header_size {
        return Ok((None, header_size));
    }

    let usable_records = (len - header_size) / INDEX_RECORD_SIZE;
    let mut pos = header_size + usable_records * INDEX_RECORD_SIZE;

    while pos > header_size {
        let candidate_offset = pos - INDEX_RECORD_SIZE;
        let rec = idx.with_reader(candidate_offset, IndexRecord::read_from)?;
        if !rec.is_zero() {
            return Ok((Some(rec), pos));
        }
        pos = candidate_offset;
    }

    Ok((None, header_size))
}

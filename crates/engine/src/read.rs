//! Point reads by seqnum.
use crate::entry::Entry;
use crate::Store;
use codec::{DataRecordHeader, IndexRecord, DATA_RECORD_HEADER_SIZE, INDEX_HEADER_SIZE, INDEX_RECORD_SIZE};
use config::StoreError;
use std::io::Read as _;

impl Store {
    /// Reads up to `out.len()` consecutive entries starting at
    /// `start_seqnum`, filling `out[..n]` with the entries found and
    /// `out[n..]` with [`Entry::empty_slot`]. Returns `n`, the number of
    /// entries actually found — `0` if `start_seqnum` is before the first
    /// stored seqnum, after the last, or the store is empty.
    ///
    /// Because seqnums are correlative, a record's index offset is derived
    /// directly from its seqnum rather than searched for.
    pub fn read(&self, start_seqnum: u64, out: &mut [Entry]) -> Result<usize, StoreError> {
        let _guard = self.locks.file.read().expect("file lock poisoned");
        let state = self.locks.read_state();

        if out.is_empty() {
            return Ok(0);
        }
        if state.is_empty() || start_seqnum < state.first_seqnum || start_seqnum > state.last_seqnum {
            for slot in out.iter_mut() {
                *slot = Entry::empty_slot();
            }
            return Ok(0);
        }

        let available = state.last_seqnum - start_seqnum + 1;
        let to_read = available.min(out.len() as u64) as usize;

        for (i, slot) in out.iter_mut().enumerate() {
            if i >= to_read {
                *slot = Entry::empty_slot();
                continue;
            }
            let seqnum = start_seqnum + i as u64;
            *slot = self.read_one(&state, seqnum)?;
        }

        Ok(to_read)
    }

    fn read_one(&self, state: &crate::state::State, seqnum: u64) -> Result<Entry, StoreError> {
        let index_offset =
            INDEX_HEADER_SIZE + (seqnum - state.first_seqnum) * INDEX_RECORD_SIZE;
        let index_record = self.idx.with_reader(index_offset, IndexRecord::read_from)?;
        if index_record.seqnum != seqnum {
            return Err(StoreError::FormatIdx(format!(
                "index record at offset {index_offset} has seqnum {} (expected {seqnum})",
                index_record.seqnum
            )));
        }

        let header = self
            .dat
            .with_reader(index_record.offset, DataRecordHeader::read_from)?;
        if header.seqnum != seqnum {
            return Err(StoreError::FormatDat(format!(
                "data record at offset {} has seqnum {} (expected {seqnum})",
                index_record.offset, header.seqnum
            )));
        }

        let (metadata, data) = self.dat.with_reader(
            index_record.offset + DATA_RECORD_HEADER_SIZE,
            |f| {
                let mut metadata = vec![0u8; header.metadata_len as usize];
                let mut data = vec![0u8; header.data_len as usize];
                f.read_exact(&mut metadata)?;
                f.read_exact(&mut data)?;
                Ok((metadata, data))
            },
        )?;

        if !header.verify(&metadata, &data) {
            return Err(StoreError::Checksum(seqnum));
        }

        Ok(Entry::new(header.seqnum, header.timestamp, &metadata, &data))
    }
}

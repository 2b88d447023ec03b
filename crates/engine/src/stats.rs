//! Range statistics.
use crate::Store;
use codec::{record_on_disk_size, DataRecordHeader, IndexRecord, INDEX_HEADER_SIZE, INDEX_RECORD_SIZE};
use config::StoreError;

/// Aggregate statistics over a seqnum range, per spec §4.9: `num_entries`
/// records spanning `index_size` bytes of index file and `data_size` bytes
/// of data file, computed from the two bracketing index records and the
/// bracket data record at the upper end — not by summing every record in
/// the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeStats {
    pub count: u64,
    pub index_size: u64,
    pub data_size: u64,
    pub first_seqnum: u64,
    pub last_seqnum: u64,
    pub first_timestamp: u64,
    pub last_timestamp: u64,
}

impl Store {
    /// Computes [`RangeStats`] over `[from_seqnum, to_seqnum]`, clamped to
    /// the store's actual `[first_seqnum, last_seqnum]`. Returns `None` if
    /// the clamped range is empty (store empty, or the requested range
    /// doesn't overlap what's stored).
    ///
    /// `index_size = num_entries * index_record_size`; `data_size =
    /// offset(hi) - offset(lo) + on_disk_size(hi)`. Only the two bracket
    /// index records and the bracket data record at `hi` are read — the
    /// cost is independent of the range's width.
    pub fn stats(&self, from_seqnum: u64, to_seqnum: u64) -> Result<Option<RangeStats>, StoreError> {
        let _guard = self.locks.file.read().expect("file lock poisoned");
        let state = self.locks.read_state();
        if state.is_empty() || to_seqnum < state.first_seqnum || from_seqnum > state.last_seqnum {
            return Ok(None);
        }

        let lo = from_seqnum.max(state.first_seqnum);
        let hi = to_seqnum.min(state.last_seqnum);

        let lo_index = self.index_record_at(&state, lo)?;
        let hi_index = if hi == lo {
            lo_index
        } else {
            self.index_record_at(&state, hi)?
        };
        let hi_header = self
            .dat
            .with_reader(hi_index.offset, DataRecordHeader::read_from)?;

        let count = hi - lo + 1;
        let index_size = count * INDEX_RECORD_SIZE;
        let data_size = hi_index.offset - lo_index.offset
            + record_on_disk_size(hi_header.metadata_len, hi_header.data_len);

        Ok(Some(RangeStats {
            count,
            index_size,
            data_size,
            first_seqnum: lo,
            last_seqnum: hi,
            first_timestamp: lo_index.timestamp,
            last_timestamp: hi_index.timestamp,
        }))
    }

    fn index_record_at(&self, state: &crate::state::State, seqnum: u64) -> Result<IndexRecord, StoreError> {
        let pos = seqnum - state.first_seqnum;
        let offset = INDEX_HEADER_SIZE + pos * INDEX_RECORD_SIZE;
        self.idx.with_reader(offset, IndexRecord::read_from)
    }
}

//! Trim suffix: discard every record with a seqnum above a threshold.
use crate::state::State;
use crate::tail;
use crate::Store;
use codec::{record_on_disk_size, DataRecordHeader, IndexRecord, DATA_HEADER_SIZE, INDEX_HEADER_SIZE, INDEX_RECORD_SIZE};
use config::StoreError;

impl Store {
    /// Discards every record with `seqnum > keep_seqnum`, returning the
    /// number of records removed. Any `keep_seqnum < first_seqnum`
    /// (including 0) empties the store entirely. A no-op (`Ok(0)`) if
    /// `keep_seqnum >= last_seqnum` (nothing to remove).
    ///
    /// In-place: the index suffix is zeroised before the data suffix, and
    /// both are flushed (with `fdatasync` if configured) before the other
    /// is touched, so a crash mid-rollback leaves the index no longer than
    /// the data it actually describes, which open-time recovery repairs.
    pub fn rollback(&self, keep_seqnum: u64) -> Result<u64, StoreError> {
        let _guard = self.locks.file.write().expect("file lock poisoned");
        let state = self.locks.read_state();

        if state.is_empty() {
            return Ok(0);
        }
        if keep_seqnum >= state.last_seqnum {
            return Ok(0);
        }

        let removed = state.last_seqnum - keep_seqnum.max(state.first_seqnum - 1);

        let new_state = if keep_seqnum < state.first_seqnum {
            self.zeroise_to(INDEX_HEADER_SIZE, DATA_HEADER_SIZE)?;
            State {
                data_end: DATA_HEADER_SIZE,
                milestone: state.milestone,
                ..State::default()
            }
        } else {
            let pos = keep_seqnum - state.first_seqnum;
            let index_offset = INDEX_HEADER_SIZE + pos * INDEX_RECORD_SIZE;
            let kept_index = self.idx.with_reader(index_offset, IndexRecord::read_from)?;
            let kept_header = self
                .dat
                .with_reader(kept_index.offset, DataRecordHeader::read_from)?;
            let new_data_end =
                kept_index.offset + record_on_disk_size(kept_header.metadata_len, kept_header.data_len);
            let new_index_len = INDEX_HEADER_SIZE + (pos + 1) * INDEX_RECORD_SIZE;

            self.zeroise_to(new_index_len, new_data_end)?;

            State {
                first_seqnum: state.first_seqnum,
                first_timestamp: state.first_timestamp,
                last_seqnum: keep_seqnum,
                last_timestamp: kept_header.timestamp,
                milestone: state.milestone,
                data_end: new_data_end,
            }
        };

        self.locks.publish_state(new_state);
        Ok(removed)
    }

    fn zeroise_to(&self, index_len: u64, data_len: u64) -> Result<(), StoreError> {
        tail::zeroise_tail(&self.idx, index_len)?;
        self.idx.flush()?;
        if self.config.force_fsync {
            self.idx.sync_data()?;
        }

        tail::zeroise_tail(&self.dat, data_len)?;
        self.dat.flush()?;
        if self.config.force_fsync {
            self.dat.sync_data()?;
        }
        Ok(())
    }
}

//! Trim prefix: discard every record with a seqnum below a threshold.
use crate::state::State;
use crate::tail;
use crate::Store;
use codec::{
    DataFileHeader, IndexFileHeader, IndexRecord, DATA_HEADER_SIZE, INDEX_HEADER_SIZE,
    INDEX_RECORD_SIZE,
};
use config::StoreError;
use std::fs::{self, OpenOptions};

impl Store {
    /// Discards every record with `seqnum < from_seqnum`, returning the
    /// number of records removed. A no-op (`Ok(0)`) if `from_seqnum <=
    /// first_seqnum`. `from_seqnum > last_seqnum` empties the store.
    ///
    /// Unlike [`rollback`](Self::rollback), purge cannot trim in place: the
    /// kept records' byte offsets all shift down, so it rewrites the data
    /// file into a temp file and renames it into place, rebuilds the index
    /// file the same way, and preserves the milestone across the rewrite.
    /// The data-file rename is the commit point — if a crash lands between
    /// the two renames, the next open finds an index file whose records
    /// disagree with the rewritten data file and rebuilds it from scratch.
    pub fn purge(&self, from_seqnum: u64) -> Result<u64, StoreError> {
        let _guard = self.locks.file.write().expect("file lock poisoned");
        let state = self.locks.read_state();

        if state.is_empty() || from_seqnum <= state.first_seqnum {
            return Ok(0);
        }

        let data_header = self.dat.with_reader(0, DataFileHeader::read_from)?;

        if from_seqnum > state.last_seqnum {
            let removed = state.last_seqnum - state.first_seqnum + 1;
            self.rewrite_data_and_index(data_header, &[], state.data_end)?;
            self.locks.publish_state(State {
                milestone: state.milestone,
                data_end: DATA_HEADER_SIZE,
                ..State::default()
            });
            return Ok(removed);
        }

        let pos = from_seqnum - state.first_seqnum;
        let kept_count = state.last_seqnum - from_seqnum + 1;
        let mut kept = Vec::with_capacity(kept_count as usize);
        for i in 0..kept_count {
            let offset = INDEX_HEADER_SIZE + (pos + i) * INDEX_RECORD_SIZE;
            kept.push(self.idx.with_reader(offset, IndexRecord::read_from)?);
        }

        let shift = self.rewrite_data_and_index(data_header, &kept, state.data_end)?;

        let last = kept.last().expect("kept is non-empty when from_seqnum <= last_seqnum");
        let new_state = State {
            first_seqnum: from_seqnum,
            first_timestamp: kept[0].timestamp,
            last_seqnum: state.last_seqnum,
            last_timestamp: last.timestamp,
            milestone: state.milestone,
            data_end: state.data_end - shift,
        };
        self.locks.publish_state(new_state);

        Ok(pos)
    }

    /// Writes a fresh data file containing only the records described by
    /// `kept` (in order, verbatim bytes, up to `data_end`), and a fresh
    /// index file with their offsets shifted to match, then renames both
    /// into place. Returns the number of bytes trimmed from the front of
    /// the data file.
    fn rewrite_data_and_index(
        &self,
        data_header: DataFileHeader,
        kept: &[IndexRecord],
        data_end: u64,
    ) -> Result<u64, StoreError> {
        let temp_dat_path = self.config.temp_path();
        let temp_idx_path = self.config.temp_index_path();

        let mut temp_dat = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_dat_path)
            .map_err(StoreError::Io)?;
        data_header.write_to(&mut temp_dat).map_err(StoreError::Io)?;

        let shift = match kept.first() {
            Some(first) => first.offset - DATA_HEADER_SIZE,
            None => data_end - DATA_HEADER_SIZE,
        };

        if let Some(first) = kept.first() {
            self.dat.with_reader(0, |f| {
                tail::bounded_copy(f, &mut temp_dat, first.offset, data_end, DATA_HEADER_SIZE)
                    .map_err(tail::store_err_to_io)
            })?;
        }
        temp_dat.sync_data().map_err(StoreError::Io)?;

        let mut temp_idx = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_idx_path)
            .map_err(StoreError::Io)?;
        IndexFileHeader::new(&description_string(&data_header))
            .write_to(&mut temp_idx)
            .map_err(StoreError::Io)?;
        for rec in kept {
            let shifted = IndexRecord {
                seqnum: rec.seqnum,
                timestamp: rec.timestamp,
                offset: rec.offset - shift,
            };
            shifted.write_to(&mut temp_idx).map_err(StoreError::Io)?;
        }
        temp_idx.sync_data().map_err(StoreError::Io)?;

        fs::rename(&temp_dat_path, self.config.data_path()).map_err(StoreError::Io)?;
        fs::rename(&temp_idx_path, self.config.index_path()).map_err(StoreError::Io)?;

        self.dat.reopen(&self.config.data_path())?;
        self.idx.reopen(&self.config.index_path())?;

        Ok(shift)
    }
}

fn description_string(header: &DataFileHeader) -> String {
    let nul = header
        .description
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(header.description.len());
    String::from_utf8_lossy(&header.description[..nul]).into_owned()
}

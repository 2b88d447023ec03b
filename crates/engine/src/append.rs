//! The sole writer of new records.
use crate::entry::EntryInput;
use crate::state::State;
use crate::Store;
use codec::{record_on_disk_size, DataRecordHeader, IndexRecord, INDEX_HEADER_SIZE, INDEX_RECORD_SIZE};
use config::StoreError;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reports a batch append that stopped partway through: how many of the
/// supplied entries were durably written before `error` occurred. Entries
/// already written remain in the store — a failed batch is not rolled back.
#[derive(Debug)]
pub struct AppendError {
    pub appended: u64,
    pub error: StoreError,
}

impl fmt::Display for AppendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "appended {} of the batch before failing: {}",
            self.appended, self.error
        )
    }
}

impl std::error::Error for AppendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl Store {
    /// Appends every entry in `entries`, in order.
    ///
    /// `seqnum == 0` assigns the next correlative seqnum; a non-zero seqnum
    /// that isn't exactly the next correlative value stops the batch there.
    /// `timestamp == 0` stamps the current wall-clock time, floored up to
    /// the last stored timestamp so stamped timestamps never decrease; a
    /// non-zero timestamp that precedes the last stored one also stops the
    /// batch there.
    ///
    /// Every entry's data record is written before its index record, and
    /// both files are flushed — with an `fdatasync` on each if
    /// [`force_fsync`](config::StoreConfig::force_fsync) is set — once at
    /// the end of the batch rather than per entry. On success the returned
    /// count equals `entries.len()`. On a validation failure partway
    /// through, the entries written so far are still flushed and published
    /// before returning [`AppendError`].
    pub fn append(&self, entries: &[EntryInput]) -> Result<u64, AppendError> {
        let mut state = self.locks.read_state();
        let mut appended = 0u64;

        for entry in entries {
            match self.append_one(&mut state, entry) {
                Ok(()) => appended += 1,
                Err(e) => {
                    if let Err(flush_err) = self.finish_batch(state) {
                        return Err(AppendError {
                            appended,
                            error: flush_err,
                        });
                    }
                    return Err(AppendError { appended, error: e });
                }
            }
        }

        self.finish_batch(state)
            .map_err(|error| AppendError { appended, error })?;
        Ok(appended)
    }

    fn append_one(&self, state: &mut State, entry: &EntryInput) -> Result<(), StoreError> {
        // On an empty store a caller-supplied nonzero seqnum is accepted
        // as-is (it becomes first_seqnum); only a non-empty store requires
        // strict correlation with last_seqnum.
        let seqnum = if entry.seqnum == 0 {
            if state.is_empty() {
                1
            } else {
                state.last_seqnum + 1
            }
        } else if state.is_empty() {
            entry.seqnum
        } else {
            let expected = state.last_seqnum + 1;
            if entry.seqnum != expected {
                return Err(StoreError::EntrySeqnum {
                    expected,
                    got: entry.seqnum,
                });
            }
            entry.seqnum
        };
        // first_seqnum this record is indexed relative to: the store's
        // existing first_seqnum, or `seqnum` itself if this is the first
        // record ever written.
        let first_seqnum = if state.is_empty() { seqnum } else { state.first_seqnum };

        let floor = if state.is_empty() {
            0
        } else {
            state.last_timestamp
        };
        let timestamp = if entry.timestamp == 0 {
            now_millis().max(floor)
        } else {
            entry.timestamp
        };
        if timestamp < floor {
            return Err(StoreError::EntryTimestamp {
                last: floor,
                got: timestamp,
            });
        }

        if entry.metadata.len() > u32::MAX as usize {
            return Err(StoreError::EntryMetadata(entry.metadata.len() as u32));
        }
        if entry.data.len() > u32::MAX as usize {
            return Err(StoreError::EntryData(entry.data.len() as u32));
        }
        let metadata_len = entry.metadata.len() as u32;
        let data_len = entry.data.len() as u32;

        let checksum = DataRecordHeader::compute_checksum(
            seqnum,
            timestamp,
            metadata_len,
            data_len,
            &entry.metadata,
            &entry.data,
        );
        let header = DataRecordHeader {
            seqnum,
            timestamp,
            metadata_len,
            data_len,
            checksum,
        };

        let offset = state.data_end;
        self.dat.with_writer(offset, |f| {
            header.write_to(f)?;
            f.write_all(&entry.metadata)?;
            f.write_all(&entry.data)?;
            Ok(())
        })?;

        let index_record = IndexRecord {
            seqnum,
            timestamp,
            offset,
        };
        // Spec §4.6: the index record for `seqnum` lives at
        // `header_size + (seqnum - first_seqnum) * index_record_size`,
        // not at the index file's physical length — rollback/recovery
        // leave zero-padding past the logical tail that a length-derived
        // offset would overshoot.
        let index_offset = INDEX_HEADER_SIZE + (seqnum - first_seqnum) * INDEX_RECORD_SIZE;
        self.idx
            .with_writer(index_offset, |f| index_record.write_to(f))?;

        if state.is_empty() {
            state.first_seqnum = seqnum;
            state.first_timestamp = timestamp;
        }
        state.last_seqnum = seqnum;
        state.last_timestamp = timestamp;
        state.data_end = offset + record_on_disk_size(metadata_len, data_len);

        Ok(())
    }

    fn finish_batch(&self, state: State) -> Result<(), StoreError> {
        self.dat.flush()?;
        self.idx.flush()?;
        if self.config.force_fsync {
            self.dat.sync_data()?;
            self.idx.sync_data()?;
        }
        self.locks.publish_state(state);
        Ok(())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

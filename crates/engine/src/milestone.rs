//! Opaque external-consensus marker update.
use crate::Store;
use codec::{write_u64, DATA_HEADER_SIZE};
use config::StoreError;

/// Byte offset of the milestone field within the data file header: it is
/// the header's last 8 bytes (magic + version + description + milestone).
const MILESTONE_OFFSET: u64 = DATA_HEADER_SIZE - 8;

impl Store {
    /// Updates the stored milestone, an opaque value the caller attaches
    /// no store-level meaning to (e.g. a consensus watermark).
    pub fn update_milestone(&self, milestone: u64) -> Result<(), StoreError> {
        let _guard = self.locks.file.write().expect("file lock poisoned");
        let mut state = self.locks.read_state();

        self.dat
            .with_writer(MILESTONE_OFFSET, |f| write_u64(f, milestone))?;
        self.dat.flush()?;
        if self.config.force_fsync {
            self.dat.sync_data()?;
        }

        state.milestone = milestone;
        self.locks.publish_state(state);
        Ok(())
    }
}

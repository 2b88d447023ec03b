//! The in-memory cache of `{first, last}` seqnum/timestamp, milestone, and
//! data-file end offset.

/// Cached store state. All fields are zero when the store is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State {
    pub first_seqnum: u64,
    pub first_timestamp: u64,
    pub last_seqnum: u64,
    pub last_timestamp: u64,
    pub milestone: u64,
    /// Byte offset one past the last data record (where the next append
    /// begins writing).
    pub data_end: u64,
}

impl State {
    /// The empty state: `data_end` is still `header_size`, supplied by the
    /// caller since this module doesn't know the codec's header size.
    pub fn empty(header_size: u64) -> Self {
        Self {
            data_end: header_size,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_seqnum == 0 && self.last_seqnum == 0
    }
}

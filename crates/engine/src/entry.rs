//! The user-facing logical record and the caller-supplied input to `append`.

/// A record as supplied to `Store::append`.
///
/// `seqnum == 0` means "assign the next seqnum"; `timestamp == 0` means
/// "stamp with wall-clock milliseconds, floored to the last stored
/// timestamp".
#[derive(Debug, Clone, Default)]
pub struct EntryInput {
    pub seqnum: u64,
    pub timestamp: u64,
    pub metadata: Vec<u8>,
    pub data: Vec<u8>,
}

impl EntryInput {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            seqnum: 0,
            timestamp: 0,
            metadata: Vec::new(),
            data: data.into(),
        }
    }

    pub fn with_seqnum(mut self, seqnum: u64) -> Self {
        self.seqnum = seqnum;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<Vec<u8>>) -> Self {
        self.metadata = metadata.into();
        self
    }
}

/// A record returned by `Store::read`.
///
/// Metadata and data share a single backing allocation, exposed as two
/// immutable slice views, instead of two separate `Vec<u8>` allocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub seqnum: u64,
    pub timestamp: u64,
    buf: Vec<u8>,
    metadata_len: usize,
}

impl Entry {
    pub(crate) fn new(seqnum: u64, timestamp: u64, metadata: &[u8], data: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(metadata.len() + data.len());
        buf.extend_from_slice(metadata);
        buf.extend_from_slice(data);
        Self {
            seqnum,
            timestamp,
            buf,
            metadata_len: metadata.len(),
        }
    }

    /// An empty sentinel entry (`seqnum == 0`) used to mark unused buffer
    /// slots in a caller-supplied output buffer.
    pub fn empty_slot() -> Self {
        Self {
            seqnum: 0,
            timestamp: 0,
            buf: Vec::new(),
            metadata_len: 0,
        }
    }

    pub fn metadata(&self) -> &[u8] {
        &self.buf[..self.metadata_len]
    }

    pub fn data(&self) -> &[u8] {
        &self.buf[self.metadata_len..]
    }
}

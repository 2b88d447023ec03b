//! A flat error-code taxonomy: a stable mapping from error kind to an
//! integer code and a human-readable string, in the spirit of a C API
//! returning a negative status code on failure.
use std::io;
use thiserror::Error;

/// A flat, stable error code. Negative, matching the source library's
/// convention of reusing the code's magnitude when rollback/purge report a
/// removed-record count on success and an error code on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    Error = -1,
    InvalidArgument = -2,
    OutOfMemory = -3,
    Path = -4,
    Name = -5,
    OpenDat = -6,
    ReadDat = -7,
    WriteDat = -8,
    OpenIdx = -9,
    ReadIdx = -10,
    WriteIdx = -11,
    FormatDat = -12,
    FormatIdx = -13,
    EntrySeqnum = -14,
    EntryTimestamp = -15,
    EntryMetadata = -16,
    EntryData = -17,
    NotFound = -18,
    TempFile = -19,
    Checksum = -20,
}

/// Maps an [`ErrorCode`] to a stable, human-readable string. The mapping is
/// guaranteed stable across releases.
pub fn error_string(code: ErrorCode) -> &'static str {
    use ErrorCode::*;
    match code {
        Ok => "ok",
        Error => "generic error",
        InvalidArgument => "invalid argument",
        OutOfMemory => "out of memory",
        Path => "invalid path",
        Name => "invalid store name",
        OpenDat => "failed to open data file",
        ReadDat => "failed to read data file",
        WriteDat => "failed to write data file",
        OpenIdx => "failed to open index file",
        ReadIdx => "failed to read index file",
        WriteIdx => "failed to write index file",
        FormatDat => "data file format error",
        FormatIdx => "index file format error",
        EntrySeqnum => "seqnum is not correlative with the last stored seqnum",
        EntryTimestamp => "timestamp precedes the last stored timestamp",
        EntryMetadata => "metadata bytes missing for declared metadata length",
        EntryData => "data bytes missing for declared data length",
        NotFound => "not found",
        TempFile => "temporary file operation failed",
        Checksum => "checksum mismatch",
    }
}

/// The structured error type returned by fallible store operations.
///
/// `NotFound` is reserved for callers that want to surface it as an error
/// (e.g. the CLI); `engine::Store`'s own read/search operations instead
/// return `Ok(None)` / `Ok(vec![])`, since a missing record is an ordinary
/// result of a read or search, not an error state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid store name {0:?}: must be 1-32 characters from [A-Za-z0-9_]")]
    InvalidName(String),

    #[error("invalid store directory: {0}")]
    InvalidPath(String),

    #[error("failed to open data file: {0}")]
    OpenDat(String),

    #[error("failed to read data file: {0}")]
    ReadDat(String),

    #[error("failed to write data file: {0}")]
    WriteDat(String),

    #[error("failed to open index file: {0}")]
    OpenIdx(String),

    #[error("failed to read index file: {0}")]
    ReadIdx(String),

    #[error("failed to write index file: {0}")]
    WriteIdx(String),

    #[error("data file format error: {0}")]
    FormatDat(String),

    #[error("index file format error: {0}")]
    FormatIdx(String),

    #[error("seqnum {got} is not correlative (expected {expected})")]
    EntrySeqnum { expected: u64, got: u64 },

    #[error("timestamp {got} precedes last stored timestamp {last}")]
    EntryTimestamp { last: u64, got: u64 },

    #[error("metadata_len {0} > 0 but no metadata bytes were supplied")]
    EntryMetadata(u32),

    #[error("data_len {0} > 0 but no data bytes were supplied")]
    EntryData(u32),

    #[error("not found")]
    NotFound,

    #[error("temporary file error: {0}")]
    TempFile(String),

    #[error("checksum mismatch at seqnum {0}")]
    Checksum(u64),
}

impl StoreError {
    /// Maps this error to its flat [`ErrorCode`].
    pub fn code(&self) -> ErrorCode {
        use StoreError::*;
        match self {
            Io(_) => ErrorCode::Error,
            InvalidArgument(_) => ErrorCode::InvalidArgument,
            InvalidName(_) => ErrorCode::Name,
            InvalidPath(_) => ErrorCode::Path,
            OpenDat(_) => ErrorCode::OpenDat,
            ReadDat(_) => ErrorCode::ReadDat,
            WriteDat(_) => ErrorCode::WriteDat,
            OpenIdx(_) => ErrorCode::OpenIdx,
            ReadIdx(_) => ErrorCode::ReadIdx,
            WriteIdx(_) => ErrorCode::WriteIdx,
            FormatDat(_) => ErrorCode::FormatDat,
            FormatIdx(_) => ErrorCode::FormatIdx,
            EntrySeqnum { .. } => ErrorCode::EntrySeqnum,
            EntryTimestamp { .. } => ErrorCode::EntryTimestamp,
            EntryMetadata(_) => ErrorCode::EntryMetadata,
            EntryData(_) => ErrorCode::EntryData,
            NotFound => ErrorCode::NotFound,
            TempFile(_) => ErrorCode::TempFile,
            Checksum(_) => ErrorCode::Checksum,
        }
    }

    /// Convenience: the human-readable string for this error's code.
    pub fn code_string(&self) -> &'static str {
        error_string(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mapping_is_total_and_distinct_where_expected() {
        assert_eq!(StoreError::NotFound.code(), ErrorCode::NotFound);
        assert_eq!(error_string(ErrorCode::NotFound), "not found");
        assert_eq!(
            StoreError::EntrySeqnum {
                expected: 2,
                got: 5
            }
            .code(),
            ErrorCode::EntrySeqnum
        );
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = io::Error::new(io::ErrorKind::Other, "boom");
        let err: StoreError = io_err.into();
        assert_eq!(err.code(), ErrorCode::Error);
    }
}

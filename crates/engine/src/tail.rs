//! Tail utilities shared by recovery, rollback, and purge: zeroise-to-end
//! and bounded file-to-file copy.
use crate::file_pair::FilePair;
use config::StoreError;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Overwrites every byte from `offset` to the current end of `file` with
/// zero, then flushes and restores the file position to `offset`.
///
/// If the file is already zero from `offset` to end, this is a no-op aside
/// from the position restore.
pub fn zeroise_from(file: &mut File, offset: u64) -> Result<(), StoreError> {
    let len = file.metadata().map_err(StoreError::Io)?.len();
    if offset >= len {
        file.seek(SeekFrom::Start(offset)).map_err(StoreError::Io)?;
        return Ok(());
    }

    if is_already_zero(file, offset, len)? {
        file.seek(SeekFrom::Start(offset)).map_err(StoreError::Io)?;
        return Ok(());
    }

    const CHUNK: usize = 8192;
    let zeros = [0u8; CHUNK];
    file.seek(SeekFrom::Start(offset)).map_err(StoreError::Io)?;
    let mut remaining = len - offset;
    while remaining > 0 {
        let n = remaining.min(CHUNK as u64) as usize;
        file.write_all(&zeros[..n]).map_err(StoreError::Io)?;
        remaining -= n as u64;
    }
    file.flush().map_err(StoreError::Io)?;
    file.seek(SeekFrom::Start(offset)).map_err(StoreError::Io)?;
    Ok(())
}

fn is_already_zero(file: &mut File, offset: u64, len: u64) -> Result<bool, StoreError> {
    file.seek(SeekFrom::Start(offset)).map_err(StoreError::Io)?;
    const CHUNK: usize = 8192;
    let mut buf = [0u8; CHUNK];
    let mut remaining = len - offset;
    while remaining > 0 {
        let n = remaining.min(CHUNK as u64) as usize;
        file.read_exact(&mut buf[..n]).map_err(StoreError::Io)?;
        if buf[..n].iter().any(|&b| b != 0) {
            return Ok(false);
        }
        remaining -= n as u64;
    }
    Ok(true)
}

/// Copies bytes `[pos0, pos1)` from `src` into `dst` starting at `pos2`,
/// preserving both files' original positions, then flushes `dst`.
///
/// Returns an error if the range is invalid (`pos1 < pos0`) or a short
/// read/write occurs.
pub fn bounded_copy(
    src: &mut File,
    dst: &mut File,
    pos0: u64,
    pos1: u64,
    pos2: u64,
) -> Result<(), StoreError> {
    if pos1 < pos0 {
        return Err(StoreError::InvalidArgument(format!(
            "bounded_copy: invalid range [{pos0}, {pos1})"
        )));
    }

    let src_restore = src.stream_position().map_err(StoreError::Io)?;
    let dst_restore = dst.stream_position().map_err(StoreError::Io)?;

    src.seek(SeekFrom::Start(pos0)).map_err(StoreError::Io)?;
    dst.seek(SeekFrom::Start(pos2)).map_err(StoreError::Io)?;

    const CHUNK: usize = 64 * 1024;
    let mut buf = vec![0u8; CHUNK];
    let mut remaining = pos1 - pos0;
    while remaining > 0 {
        let n = remaining.min(CHUNK as u64) as usize;
        src.read_exact(&mut buf[..n]).map_err(StoreError::Io)?;
        dst.write_all(&buf[..n]).map_err(StoreError::Io)?;
        remaining -= n as u64;
    }
    dst.flush().map_err(StoreError::Io)?;

    src.seek(SeekFrom::Start(src_restore)).map_err(StoreError::Io)?;
    dst.seek(SeekFrom::Start(dst_restore)).map_err(StoreError::Io)?;
    Ok(())
}

/// Zeroises `pair`'s write handle from `offset` to its current end, for
/// callers that only hold a [`FilePair`] and not a raw `File`.
pub fn zeroise_tail(pair: &FilePair, offset: u64) -> Result<(), StoreError> {
    pair.with_writer(0, |f| zeroise_from(f, offset).map_err(store_err_to_io))
}

pub(crate) fn store_err_to_io(e: StoreError) -> io::Error {
    match e {
        StoreError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn open_rw(path: &std::path::Path) -> File {
        std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .unwrap()
    }

    #[test]
    fn zeroise_from_clears_tail_and_restores_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        let mut f = open_rw(&path);
        f.write_all(b"0123456789").unwrap();

        zeroise_from(&mut f, 4).unwrap();

        assert_eq!(f.stream_position().unwrap(), 4);
        let mut buf = Vec::new();
        f.seek(SeekFrom::Start(0)).unwrap();
        f.read_to_end(&mut buf).unwrap();
        assert_eq!(&buf, b"0123\0\0\0\0\0\0");
    }

    #[test]
    fn zeroise_from_is_noop_when_already_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        let mut f = open_rw(&path);
        f.write_all(&[0u8; 8]).unwrap();

        zeroise_from(&mut f, 2).unwrap();

        f.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = Vec::new();
        f.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![0u8; 8]);
    }

    #[test]
    fn bounded_copy_moves_exact_range_and_preserves_positions() {
        let dir = tempdir().unwrap();
        let src_path = dir.path().join("src");
        let dst_path = dir.path().join("dst");
        let mut src = open_rw(&src_path);
        src.write_all(b"abcdefghij").unwrap();
        src.seek(SeekFrom::Start(3)).unwrap();

        let mut dst = open_rw(&dst_path);
        dst.write_all(b"XXXX").unwrap();
        dst.seek(SeekFrom::Start(1)).unwrap();

        bounded_copy(&mut src, &mut dst, 2, 6, 4).unwrap();

        assert_eq!(src.stream_position().unwrap(), 3);
        assert_eq!(dst.stream_position().unwrap(), 1);

        let mut buf = Vec::new();
        dst.seek(SeekFrom::Start(0)).unwrap();
        dst.read_to_end(&mut buf).unwrap();
        assert_eq!(&buf, b"XXXXcdef");
    }

    #[test]
    fn bounded_copy_rejects_invalid_range() {
        let dir = tempdir().unwrap();
        let mut src = open_rw(&dir.path().join("src"));
        let mut dst = open_rw(&dir.path().join("dst"));
        assert!(bounded_copy(&mut src, &mut dst, 5, 2, 0).is_err());
    }
}

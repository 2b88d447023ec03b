//! A `.dat`/`.idx`-style pair of OS handles over the same inode: one for
//! writer operations, one for reader operations, so readers never disturb
//! the writer's seek position.
use config::StoreError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

/// Two views of the same file: a read-write handle used exclusively by
/// writer-type operations, and a read-only handle (duplicated from the
/// writer at open time) used exclusively by reader-type operations.
pub struct FilePair {
    write: Mutex<File>,
    read: Mutex<File>,
}

impl FilePair {
    /// Opens `path`, creating it if `create` is true. The read handle is a
    /// `try_clone()` of the write handle so both refer to the same inode.
    pub fn open(path: &Path, create: bool) -> Result<Self, StoreError> {
        let write = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .open(path)
            .map_err(|e| io_open_err(path, e))?;
        let read = write.try_clone().map_err(StoreError::Io)?;
        Ok(Self {
            write: Mutex::new(write),
            read: Mutex::new(read),
        })
    }

    /// Runs `f` against the write handle, seeked to `offset` first.
    pub fn with_writer<T>(
        &self,
        offset: u64,
        f: impl FnOnce(&mut File) -> io::Result<T>,
    ) -> Result<T, StoreError> {
        let mut file = self.write.lock().expect("file-pair write lock poisoned");
        file.seek(SeekFrom::Start(offset)).map_err(StoreError::Io)?;
        f(&mut file).map_err(StoreError::Io)
    }

    /// Runs `f` against the read handle, seeked to `offset` first.
    pub fn with_reader<T>(
        &self,
        offset: u64,
        f: impl FnOnce(&mut File) -> io::Result<T>,
    ) -> Result<T, StoreError> {
        let mut file = self.read.lock().expect("file-pair read lock poisoned");
        file.seek(SeekFrom::Start(offset)).map_err(StoreError::Io)?;
        f(&mut file).map_err(StoreError::Io)
    }

    /// Current length of the file in bytes.
    pub fn len(&self) -> Result<u64, StoreError> {
        let file = self.write.lock().expect("file-pair write lock poisoned");
        Ok(file.metadata().map_err(StoreError::Io)?.len())
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        let mut file = self.write.lock().expect("file-pair write lock poisoned");
        file.flush().map_err(StoreError::Io)
    }

    pub fn sync_data(&self) -> Result<(), StoreError> {
        let file = self.write.lock().expect("file-pair write lock poisoned");
        file.sync_data().map_err(StoreError::Io)
    }

    /// Truncates (or extends with zeros) the file to exactly `len` bytes.
    pub fn set_len(&self, len: u64) -> Result<(), StoreError> {
        let file = self.write.lock().expect("file-pair write lock poisoned");
        file.set_len(len).map_err(StoreError::Io)
    }

    /// Re-opens `path` and replaces both handles with fresh ones.
    ///
    /// Needed after purge renames a new file into place: the existing
    /// handles still refer to the old (now unlinked) inode.
    pub fn reopen(&self, path: &Path) -> Result<(), StoreError> {
        let write = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| io_open_err(path, e))?;
        let read = write.try_clone().map_err(StoreError::Io)?;
        *self.write.lock().expect("file-pair write lock poisoned") = write;
        *self.read.lock().expect("file-pair read lock poisoned") = read;
        Ok(())
    }
}

fn io_open_err(path: &Path, e: io::Error) -> StoreError {
    StoreError::Io(io::Error::new(
        e.kind(),
        format!("{}: {}", path.display(), e),
    ))
}

/// Reads exactly `buf.len()` bytes into `buf`, treating `UnexpectedEof` as a
/// distinguishable short read so callers can decide whether that's a torn
/// tail (recoverable) or a hard error.
pub fn try_read_exact(f: &mut File, buf: &mut [u8]) -> io::Result<bool> {
    match f.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

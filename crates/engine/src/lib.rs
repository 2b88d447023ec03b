//! # engine — the ledgerdb append-only record store
//!
//! An embeddable, append-only log-structured record store for sequentially
//! numbered, timestamp-ordered variable-length records. Built for callers
//! that write far more than they read — journals, write-ahead logs, the log
//! layer of a consensus implementation — and need crash tolerance, bounded
//! recovery, and a minimal resident footprint.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Store                                │
//! │                                                                │
//! │ append()  → data file (header+metadata+data) → index file     │
//! │              |                                                │
//! │              v  (publish under the state lock)                │
//! │            State { first/last seqnum/timestamp, milestone,    │
//! │                     data_end }                                │
//! │                                                                │
//! │ read()/search()/stats() → snapshot state → read under file    │
//! │                            lock (shared)                      │
//! │                                                                │
//! │ rollback()/purge() → file lock (exclusive) → trim/rewrite →   │
//! │                       publish state                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module       | Purpose                                               |
//! |--------------|--------------------------------------------------------|
//! | [`lib.rs`]   | `Store` struct, `open`/`close`, accessors, `Debug`      |
//! | [`recovery`] | Opener/recoverer: validates and repairs both files      |
//! | [`append`]   | The sole writer of new records                          |
//! | [`read`]     | Point reads by seqnum                                   |
//! | [`search`]   | Binary search by timestamp                              |
//! | [`stats`]    | Range statistics                                        |
//! | [`rollback`] | Trim suffix (remove records above a threshold)          |
//! | [`purge`]    | Trim prefix (remove records below a threshold)          |
//! | [`milestone`]| Opaque external-consensus marker update                 |
//! | [`walk`]     | Shared data/index walking primitives used by recovery   |
//! | [`tail`]     | Zeroise-to-end and bounded file-to-file copy            |
//! | [`file_pair`]| Paired read/write OS handles over one file              |
//! | [`locks`]    | The file/state advisory lock pair                       |
//! | [`state`]    | The cached `{first, last}` seqnum/timestamp/milestone   |
//! | [`entry`]    | The user-facing `Entry`/`EntryInput` types               |
//!
//! ## Crash safety
//!
//! Every append writes the data record before its index record, and flushes
//! the data file before the index file, so a crash between the two leaves a
//! data record with no matching index entry — exactly the case `recovery`
//! repairs on the next open. Rollback zeroises the index suffix before the
//! data suffix; purge's commit point is the data-file rename, with recovery
//! rebuilding the index afterward.
mod append;
mod entry;
mod file_pair;
mod locks;
mod milestone;
mod purge;
mod read;
mod recovery;
mod rollback;
mod search;
mod stats;
mod state;
mod tail;
mod walk;

pub use append::AppendError;
pub use config::{ErrorCode, StoreConfig, StoreError};
pub use entry::{Entry, EntryInput};
pub use search::SearchMode;
pub use stats::RangeStats;

use file_pair::FilePair;
use locks::Locks;

/// A ledgerdb store: the open data/index file pair plus cached state and
/// the advisory locks that discipline concurrent access.
///
/// A `Store` exclusively owns its two files for the lifetime between `open`
/// and `close`/`Drop`. Construction performs full open-time recovery; there
/// is no separate "create" step.
pub struct Store {
    pub(crate) config: StoreConfig,
    pub(crate) dat: FilePair,
    pub(crate) idx: FilePair,
    pub(crate) locks: Locks,
}

impl Store {
    /// Returns the current `first_seqnum`, or 0 if the store is empty.
    pub fn first_seqnum(&self) -> u64 {
        self.locks.read_state().first_seqnum
    }

    /// Returns the current `last_seqnum`, or 0 if the store is empty.
    pub fn last_seqnum(&self) -> u64 {
        self.locks.read_state().last_seqnum
    }

    /// Returns the current `first_timestamp`, or 0 if the store is empty.
    pub fn first_timestamp(&self) -> u64 {
        self.locks.read_state().first_timestamp
    }

    /// Returns the current `last_timestamp`, or 0 if the store is empty.
    pub fn last_timestamp(&self) -> u64 {
        self.locks.read_state().last_timestamp
    }

    /// Returns the current milestone value.
    pub fn milestone(&self) -> u64 {
        self.locks.read_state().milestone
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> u64 {
        let s = self.locks.read_state();
        if s.is_empty() {
            0
        } else {
            s.last_seqnum - s.first_seqnum + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locks.read_state().is_empty()
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Closes the store. Dropping a `Store` has the same effect; `close` is
    /// simply an explicit, named spelling of it.
    pub fn close(self) {
        drop(self)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.locks.read_state();
        f.debug_struct("Store")
            .field("name", &self.config.name)
            .field("dir", &self.config.dir)
            .field("first_seqnum", &s.first_seqnum)
            .field("last_seqnum", &s.last_seqnum)
            .field("first_timestamp", &s.first_timestamp)
            .field("last_timestamp", &s.last_timestamp)
            .field("milestone", &s.milestone)
            .field("data_end", &s.data_end)
            .field("force_fsync", &self.config.force_fsync)
            .finish()
    }
}

#[cfg(test)]
mod tests;

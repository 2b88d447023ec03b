//! The concurrency gate: two advisory locks disciplining the interaction of
//! the single writer and many readers.
//!
//! - `file` is the long-held lock guarding file-level coherence between the
//!   cached state and the file contents. Readers (`read`, `search`, `stats`)
//!   take it shared; destructive writers (`rollback`, `purge`) take it
//!   exclusive. `append` deliberately never takes it, so append is never
//!   blocked by readers — it only grows the files and publishes state after
//!   flushing.
//! - `state` is the short-held lock guarding the in-memory `State` block.
use crate::state::State;
use std::sync::{Mutex, RwLock};

pub struct Locks {
    pub file: RwLock<()>,
    pub state: Mutex<State>,
}

impl Locks {
    pub fn new(state: State) -> Self {
        Self {
            file: RwLock::new(()),
            state: Mutex::new(state),
        }
    }

    pub fn read_state(&self) -> State {
        *self.state.lock().expect("state lock poisoned")
    }

    pub fn publish_state(&self, new_state: State) {
        *self.state.lock().expect("state lock poisoned") = new_state;
    }
}

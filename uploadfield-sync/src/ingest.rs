//! Debounce buffer for widget events.
//!
//! Widget events arrive in bursts (a multi-file drop fires one
//! upload-success per file within milliseconds). Each accepted event lands
//! in one FIFO buffer and resets the single flush deadline; when the
//! deadline fires, the whole buffer drains into store mutations in arrival
//! order and commits once.
//!
//! The buffer is kind-tagged but ordered globally: an upload followed by a
//! removal replays in exactly that order at flush time.

use std::collections::VecDeque;
use uploadfield_store::Mutation;

/// FIFO buffer of store mutations awaiting the debounce flush.
#[derive(Debug, Default)]
pub struct PendingBuffer {
    queue: VecDeque<Mutation>,
}

impl PendingBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers one mutation at the tail.
    pub fn push(&mut self, mutation: Mutation) {
        self.queue.push_back(mutation);
    }

    /// Drains the whole buffer in arrival order.
    pub fn drain(&mut self) -> Vec<Mutation> {
        self.queue.drain(..).collect()
    }

    /// Discards everything buffered (host state took precedence).
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Number of buffered mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

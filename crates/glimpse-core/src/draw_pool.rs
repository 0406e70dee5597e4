//! Per-swapchain pool of in-flight draw records.
//!
//! Each present needs a record (command buffer, fence, semaphore, vertex
//! buffers). Records are recycled oldest-first: if the oldest record's
//! fence has signaled it is reused, otherwise a fresh one is allocated.
//! Steady state therefore allocates exactly as many records as frames the
//! driver keeps in flight, and never more.

use std::collections::VecDeque;

pub struct DrawPool<T> {
    /// Front is the record submitted longest ago.
    records: VecDeque<T>,
}

impl<T> Default for DrawPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DrawPool<T> {
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
        }
    }

    /// Records allocated so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hand out a record for the next submission. `is_idle` probes whether
    /// the GPU is done with a record (fence status); `alloc` builds a new
    /// one when the oldest is still in flight. The returned record moves to
    /// the back of the queue as the most recently submitted.
    pub fn acquire<E>(
        &mut self,
        is_idle: impl FnOnce(&T) -> Result<bool, E>,
        alloc: impl FnOnce() -> Result<T, E>,
    ) -> Result<&mut T, E> {
        let reuse = match self.records.front() {
            Some(oldest) => is_idle(oldest)?,
            None => false,
        };
        if reuse {
            // pop/push rather than rotate so the borrow ends cleanly.
            if let Some(record) = self.records.pop_front() {
                self.records.push_back(record);
            }
        } else {
            self.records.push_back(alloc()?);
        }
        // Non-empty: one of the branches above pushed.
        #[allow(clippy::unwrap_used)]
        Ok(self.records.back_mut().unwrap())
    }

    /// Drain every record for teardown, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.records.drain(..)
    }
}

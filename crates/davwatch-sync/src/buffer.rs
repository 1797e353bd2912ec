//! In-memory event buffer
//!
//! Staging area between the OS watcher callback and the periodic ingest
//! task. Producers share a read lock over a lock-free queue, so bursts of
//! notifications never serialize on each other; the ingest task takes the
//! write lock to swap the whole queue out in one atomic step.
//!
//! Both lock acquisitions are bounded. A producer that cannot get the
//! read lock within the timeout drops its event (the OS callback must
//! never block the watcher thread); a flush that cannot get the write
//! lock returns empty and the events survive until the next cycle.

use std::mem;
use std::time::Duration;

use crossbeam_queue::SegQueue;
use parking_lot::RwLock;
use tracing::{debug, error};

use davwatch_core::RawEvent;

/// Concurrent staging buffer for raw watcher events
pub struct EventBuffer {
    queue: RwLock<SegQueue<RawEvent>>,
    lock_timeout: Duration,
}

impl EventBuffer {
    /// Creates a buffer whose lock acquisitions give up after
    /// `lock_timeout_ms` milliseconds.
    pub fn new(lock_timeout_ms: u64) -> Self {
        Self {
            queue: RwLock::new(SegQueue::new()),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
        }
    }

    /// Appends an event to the buffer.
    ///
    /// Non-blocking beyond the lock timeout: if a flush holds the write
    /// lock for longer than that, the event is dropped with an error log
    /// rather than stalling the watcher callback.
    pub fn add(&self, event: RawEvent) {
        match self.queue.try_read_for(self.lock_timeout) {
            Some(queue) => queue.push(event),
            None => {
                error!(
                    path = %event.path().display(),
                    "Buffer lock timed out, dropping event"
                );
            }
        }
    }

    /// Atomically drains the buffer, returning every event added so far.
    ///
    /// Events pushed while the flush holds the write lock wait on the
    /// lock and land in the fresh queue. If the write lock cannot be
    /// acquired within the timeout, nothing is drained and the buffered
    /// events are retained for the next flush.
    pub fn flush(&self) -> Vec<RawEvent> {
        let drained = match self.queue.try_write_for(self.lock_timeout) {
            Some(mut queue) => mem::take(&mut *queue),
            None => {
                error!("Buffer write lock timed out, retaining events for next cycle");
                return Vec::new();
            }
        };

        let mut events = Vec::with_capacity(drained.len());
        while let Some(event) = drained.pop() {
            events.push(event);
        }

        if !events.is_empty() {
            debug!(count = events.len(), "Buffer flushed");
        }
        events
    }

    /// Current number of buffered events (approximate under concurrency).
    pub fn len(&self) -> usize {
        self.queue.read().len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Bounded FIFO pools of virtual timestamps.

use crate::SimTime;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Semaphore;

/// Capacity used for pools referenced by a process but not explicitly sized.
pub const DEFAULT_POOL_CAPACITY: usize = 1000;

/// A bounded FIFO queue of virtual timestamps shared between processes.
///
/// A pool may be written by many producer replicas and drained by many
/// consumer replicas at once. Capacity is fixed at creation: a producer
/// pushing into a full pool blocks until a consumer frees a slot, and a
/// consumer popping from an empty pool blocks until a token arrives. This
/// blocking is the engine's backpressure signal; a pool itself never fails,
/// never drops a token and never reorders tokens.
///
/// Slot and token accounting lives in two semaphores so that waiting
/// replicas suspend instead of polling. The semaphores are fair: waiters on
/// the same pool are served in arrival order, which is what lets a replica
/// claim a multi-token requirement as a unit with [`Pool::pop_many`] without
/// sibling replicas stealing part of it.
#[derive(Debug)]
pub struct Pool {
    name: String,
    capacity: usize,
    /// Free slots; producers claim from here before enqueueing.
    free: Semaphore,
    /// Enqueued tokens; consumers claim from here before dequeueing.
    available: Semaphore,
    queue: Mutex<VecDeque<SimTime>>,
}

impl Pool {
    /// Create an empty pool with the given fixed capacity.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            free: Semaphore::new(capacity),
            available: Semaphore::new(0),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// The pool's name, unique within its model.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fixed capacity this pool was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current queue depth. Non-blocking; used for reporting.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether the pool currently holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one timestamp, waiting for a free slot if the pool is full.
    pub async fn push(&self, stamp: SimTime) {
        self.push_many(stamp, 1).await;
    }

    /// Append `count` copies of `stamp`, waiting until that many slots are
    /// free. The slots are claimed as a unit, so concurrent producers cannot
    /// interleave partial batches into the capacity accounting.
    ///
    /// Cancel-safe: dropping the future before it completes releases any
    /// slots it had claimed and enqueues nothing.
    pub async fn push_many(&self, stamp: SimTime, count: u32) {
        // The semaphores are created once per run and never closed, so
        // acquisition can only fail if that invariant is broken.
        let permit = self
            .free
            .acquire_many(count)
            .await
            .expect("pool semaphore closed");
        permit.forget();
        {
            let mut queue = self.queue.lock();
            for _ in 0..count {
                queue.push_back(stamp);
            }
        }
        self.available.add_permits(count as usize);
    }

    /// Remove and return the oldest timestamp, waiting until one arrives.
    pub async fn pop(&self) -> SimTime {
        self.pop_many(1).await
    }

    /// Remove the `count` oldest timestamps as a unit and return the latest
    /// among them.
    ///
    /// This is the rendezvous primitive: the tokens are claimed atomically,
    /// and because waiters are served in FIFO order the first replica to ask
    /// receives its full requirement before any later replica sees a token.
    /// Only the latest stamp matters to a consumer, since that is what
    /// drives its clock forward.
    ///
    /// Cancel-safe: dropping the future releases any tokens it had claimed.
    pub async fn pop_many(&self, count: u32) -> SimTime {
        let permit = self
            .available
            .acquire_many(count)
            .await
            .expect("pool semaphore closed");
        permit.forget();
        let latest = {
            let mut queue = self.queue.lock();
            let mut latest = SimTime::ZERO;
            for _ in 0..count {
                // The permits guarantee the tokens are present.
                let stamp = queue.pop_front().expect("pool accounting out of sync");
                latest = latest.max(stamp);
            }
            latest
        };
        self.free.add_permits(count as usize);
        latest
    }
}

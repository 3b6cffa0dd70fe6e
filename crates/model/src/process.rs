//! The per-replica process execution loop.

use crate::pool::Pool;
use crate::SimTime;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Live counters for one process, shared by all of its replicas.
///
/// Everything else a replica mutates (its clock, its batch number) is
/// private to its task; these atomics are the only cross-replica state
/// besides the pools themselves, and they exist so a report can be taken
/// from outside the running tasks.
#[derive(Debug, Default)]
pub struct ProcessStats {
    /// Batches whose input rendezvous completed.
    started: AtomicU64,
    /// Batches whose outputs were fully produced.
    completed: AtomicU64,
    /// Cumulative virtual time spent ready-but-waiting for tardy inputs.
    idle_nanos: AtomicU64,
}

impl ProcessStats {
    /// Batches started across all replicas.
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Batches completed across all replicas.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Batches consumed but not yet (or never) produced.
    pub fn in_flight(&self) -> u64 {
        // Read completed first so a concurrent completion can only shrink
        // the difference, never underflow it.
        let completed = self.completed();
        self.started().saturating_sub(completed)
    }

    /// Cumulative idle time across all replicas.
    pub fn idle_time(&self) -> SimTime {
        SimTime::from_nanos(self.idle_nanos.load(Ordering::SeqCst))
    }

    fn record_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn record_idle(&self, waited: SimTime) {
        self.idle_nanos
            .fetch_add(waited.as_nanos() as u64, Ordering::SeqCst);
    }
}

/// One independently clocked instance of a process.
///
/// Replicas of the same process share pool references and a [`ProcessStats`],
/// nothing else. Each runs [`Replica::run`] as its own tokio task.
pub(crate) struct Replica {
    pub(crate) process: Arc<str>,
    pub(crate) index: u32,
    pub(crate) duration: SimTime,
    pub(crate) inputs: Vec<(Arc<Pool>, u32)>,
    pub(crate) outputs: Vec<(Arc<Pool>, u32)>,
    pub(crate) stats: Arc<ProcessStats>,
}

impl Replica {
    /// Run batches until the next batch would finish past `horizon`, or
    /// until `cancel` fires while the replica is blocked on a pool.
    ///
    /// The virtual clock starts at zero, advances to the latest input stamp
    /// of each batch (accruing idle time for the gap) and then jumps by the
    /// processing duration. It never moves backwards. No wall-clock time
    /// passes on behalf of the simulation itself.
    pub(crate) async fn run(self, horizon: SimTime, cancel: CancellationToken) {
        let mut clock = SimTime::ZERO;
        let mut batch: u64 = 0;

        loop {
            // Cooperative checkpoint: a replica that never blocks on a pool
            // (a source with plenty of capacity, a process with no outputs)
            // must still share the executor and observe cancellation.
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                return;
            }

            // Consume phase: draw the full requirement from every input
            // pool. The latest stamp seen anywhere in the batch is what the
            // clock must catch up to.
            let mut last = clock;
            for (pool, count) in &self.inputs {
                let stamp = tokio::select! {
                    _ = cancel.cancelled() => return,
                    stamp = pool.pop_many(*count) => stamp,
                };
                last = last.max(stamp);
            }

            if last > clock {
                self.stats.record_idle(last - clock);
                clock = last;
            }
            self.stats.record_started();
            debug!(
                process = %self.process,
                replica = self.index,
                batch,
                clock_us = clock.as_micros() as u64,
                "batch started"
            );

            let finish = clock.saturating_add(self.duration);
            if finish > horizon {
                // This batch would outlive the run; it is discarded, not
                // completed.
                debug!(
                    process = %self.process,
                    replica = self.index,
                    completed = batch,
                    "replica done"
                );
                return;
            }
            clock = finish;

            // Produce phase: stamp every output token with the finish time.
            for (pool, count) in &self.outputs {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = pool.push_many(clock, *count) => {}
                }
            }
            self.stats.record_completed();
            debug!(
                process = %self.process,
                replica = self.index,
                batch,
                clock_us = clock.as_micros() as u64,
                "batch completed"
            );
            batch += 1;
        }
    }
}

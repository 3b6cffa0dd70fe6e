//! On-demand snapshots of a running or finished model.

use crate::SimTime;
use serde::Serialize;

/// Snapshot of one process's counters, aggregated across its replicas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub name: String,
    /// Batches fully produced.
    pub completed: u64,
    /// Batches consumed but not (yet) produced.
    pub in_flight: u64,
    /// Cumulative virtual time spent waiting for tardy inputs.
    pub idle_time: SimTime,
}

/// Snapshot of one pool's queue depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    pub name: String,
    /// Tokens currently enqueued.
    pub depth: usize,
    pub capacity: usize,
}

/// A point-in-time summary of the whole model, sorted by name.
///
/// A report is derived from live atomic counters and pool depths; it is
/// internally consistent per counter but only valid as of the instant it
/// was taken. Taking one never blocks the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub processes: Vec<ProcessReport>,
    pub pools: Vec<PoolReport>,
}

impl Report {
    /// Look up a process entry by name.
    pub fn process(&self, name: &str) -> Option<&ProcessReport> {
        self.processes.iter().find(|p| p.name == name)
    }

    /// Look up a pool entry by name.
    pub fn pool(&self, name: &str) -> Option<&PoolReport> {
        self.pools.iter().find(|p| p.name == name)
    }

    /// Total completed batches across every process.
    pub fn total_completed(&self) -> u64 {
        self.processes.iter().map(|p| p.completed).sum()
    }
}

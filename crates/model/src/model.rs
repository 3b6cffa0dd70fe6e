//! Model construction and run orchestration.

use crate::config::{ModelConfig, Topology};
use crate::error::ConfigError;
use crate::pool::{Pool, DEFAULT_POOL_CAPACITY};
use crate::process::{ProcessStats, Replica};
use crate::report::{PoolReport, ProcessReport, Report};
use crate::{Condition, SimTime};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One process plus the shared state its replicas run against.
struct ProcessEntry {
    name: Arc<str>,
    duration: SimTime,
    replicas: u32,
    inputs: Vec<(Arc<Pool>, u32)>,
    outputs: Vec<(Arc<Pool>, u32)>,
    stats: Arc<ProcessStats>,
}

/// A queueing network ready to run: pools wired to process entries.
///
/// The topology is fixed once a `Model` exists. Runs are launched with
/// [`Model::start`] (non-blocking, returns a [`RunHandle`]) or one of the
/// blocking conveniences ([`Model::run_for`], [`Model::run_until`]); a model
/// can be run repeatedly, with counters accumulating across runs.
pub struct Model {
    pools: BTreeMap<String, Arc<Pool>>,
    processes: Vec<ProcessEntry>,
}

impl Model {
    /// Build a model from a resolved topology.
    ///
    /// Process entries reference pools by name; a name missing from the
    /// topology's pool list (possible only for hand-built topologies, never
    /// for [`ModelConfig::resolve`] output) gets a pool with the default
    /// capacity, mirroring the implicit creation the configuration layer
    /// performs explicitly.
    pub fn new(topology: Topology) -> Self {
        let mut pools: BTreeMap<String, Arc<Pool>> = topology
            .pools
            .iter()
            .map(|spec| {
                (
                    spec.name.clone(),
                    Arc::new(Pool::new(spec.name.clone(), spec.capacity)),
                )
            })
            .collect();

        fn wire(pools: &mut BTreeMap<String, Arc<Pool>>, name: &str) -> Arc<Pool> {
            Arc::clone(pools.entry(name.to_string()).or_insert_with(|| {
                Arc::new(Pool::new(name.to_string(), DEFAULT_POOL_CAPACITY))
            }))
        }

        let mut processes = Vec::with_capacity(topology.processes.len());
        for spec in &topology.processes {
            let inputs = spec
                .inputs
                .iter()
                .map(|(pool, count)| (wire(&mut pools, pool), *count))
                .collect();
            let outputs = spec
                .outputs
                .iter()
                .map(|(pool, count)| (wire(&mut pools, pool), *count))
                .collect();
            processes.push(ProcessEntry {
                name: Arc::from(spec.name.as_str()),
                duration: spec.duration,
                replicas: spec.replicas,
                inputs,
                outputs,
                stats: Arc::new(ProcessStats::default()),
            });
        }

        Self { pools, processes }
    }

    /// Resolve a configuration and build the model it describes.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.resolve()?))
    }

    /// Load, resolve and build a model from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_config(&ModelConfig::from_file(path)?)
    }

    /// Shared handle to a pool, mainly for feeding or draining tokens from
    /// outside the model in tests and harnesses.
    pub fn pool(&self, name: &str) -> Option<Arc<Pool>> {
        self.pools.get(name).map(Arc::clone)
    }

    /// Launch one task per process replica and return without waiting.
    ///
    /// Each replica runs until its next batch would finish past `horizon`
    /// or until the returned handle cancels the run. Joining is the
    /// handle's job; see [`RunHandle`].
    pub fn start(&self, horizon: SimTime) -> RunHandle {
        let cancel = CancellationToken::new();
        let replica_count: u32 = self.processes.iter().map(|p| p.replicas).sum();
        info!(
            processes = self.processes.len(),
            replicas = replica_count,
            pools = self.pools.len(),
            horizon = ?horizon,
            "Starting run"
        );

        let mut tasks = Vec::with_capacity(replica_count as usize);
        for entry in &self.processes {
            for index in 0..entry.replicas {
                let replica = Replica {
                    process: Arc::clone(&entry.name),
                    index,
                    duration: entry.duration,
                    inputs: entry.inputs.clone(),
                    outputs: entry.outputs.clone(),
                    stats: Arc::clone(&entry.stats),
                };
                tasks.push(ReplicaTask {
                    label: format!("{}-{}", entry.name, index),
                    handle: tokio::spawn(replica.run(horizon, cancel.clone())),
                });
            }
        }

        RunHandle { cancel, tasks }
    }

    /// Run until every replica has passed `horizon`, waiting at most
    /// `wall_budget` of real time before cancelling whatever is still
    /// blocked (structurally starved processes never pass their horizon on
    /// their own).
    pub async fn run_for(&self, horizon: SimTime, wall_budget: Duration) -> Report {
        let handle = self.start(horizon);
        handle.join_within(wall_budget).await;
        self.report()
    }

    /// Run with an unbounded horizon until every condition in `conditions`
    /// holds for a single live report, polling every `poll_interval` of
    /// real time. An empty condition set returns immediately.
    pub async fn run_until(
        &self,
        conditions: &[Box<dyn Condition>],
        poll_interval: Duration,
    ) -> Report {
        if conditions.is_empty() {
            return self.report();
        }

        let handle = self.start(SimTime::MAX);
        loop {
            tokio::time::sleep(poll_interval).await;
            let report = self.report();
            if conditions.iter().all(|c| c.evaluate(&report)) {
                break;
            }
            if handle.is_finished() {
                break;
            }
        }
        handle.cancel();
        handle.join().await;
        self.report()
    }

    /// Take a snapshot of every process's counters and every pool's depth,
    /// sorted by name.
    pub fn report(&self) -> Report {
        let processes = self
            .processes
            .iter()
            .map(|entry| ProcessReport {
                name: entry.name.to_string(),
                completed: entry.stats.completed(),
                in_flight: entry.stats.in_flight(),
                idle_time: entry.stats.idle_time(),
            })
            .collect();
        let pools = self
            .pools
            .iter()
            .map(|(name, pool)| PoolReport {
                name: name.clone(),
                depth: pool.len(),
                capacity: pool.capacity(),
            })
            .collect();
        Report { processes, pools }
    }
}

struct ReplicaTask {
    label: String,
    handle: JoinHandle<()>,
}

/// A launched run: one join handle per replica plus the run's cancellation
/// token.
///
/// Every replica signals completion through its task handle, so joining is
/// exact rather than a guess about how long the run might take. Because a
/// replica blocked on a starved pool can never observe the horizon,
/// [`RunHandle::join_within`] bounds the real-time wait and cancels the
/// stragglers.
pub struct RunHandle {
    cancel: CancellationToken,
    tasks: Vec<ReplicaTask>,
}

impl RunHandle {
    /// Unblock every waiting replica and make all of them return promptly.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether every replica has already stopped.
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|task| task.handle.is_finished())
    }

    /// Wait for every replica to stop on its own.
    ///
    /// This does not time out: on a topology with a structurally starved
    /// process it waits forever unless [`RunHandle::cancel`] is called from
    /// elsewhere. Prefer [`RunHandle::join_within`] when that is a risk.
    pub async fn join(mut self) {
        Self::join_all(&mut self.tasks).await;
    }

    /// Wait for every replica to stop, but no longer than `budget` of real
    /// time; on expiry, log the replicas still blocked, cancel the run and
    /// join them. Returns whether the run finished on its own.
    pub async fn join_within(mut self, budget: Duration) -> bool {
        if timeout(budget, Self::join_all(&mut self.tasks)).await.is_ok() {
            return true;
        }
        for task in &self.tasks {
            if !task.handle.is_finished() {
                warn!(
                    replica = %task.label,
                    "Replica still blocked at join budget, cancelling run"
                );
            }
        }
        self.cancel.cancel();
        Self::join_all(&mut self.tasks).await;
        false
    }

    // Joins from the back so a task is only popped once it has completed;
    // a timed-out partial join leaves the remainder joinable.
    async fn join_all(tasks: &mut Vec<ReplicaTask>) {
        while let Some(task) = tasks.last_mut() {
            let _ = (&mut task.handle).await;
            tasks.pop();
        }
    }
}

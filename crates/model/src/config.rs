//! Declarative model configuration and its resolution into a topology.
//!
//! A model file is TOML:
//!
//! ```toml
//! [pools]
//! ore = 50              # optional explicit capacities
//!
//! [processes.mine]
//! duration = "2s"       # fixed processing time per batch
//! replicas = 2          # defaults to 1
//! [processes.mine.out]
//! ore = 2               # tokens produced per batch
//!
//! [processes.smelt]
//! duration = "3s"
//! [processes.smelt.in]
//! ore = 5               # tokens required per batch
//! [processes.smelt.out]
//! metal = 1
//! ```
//!
//! Loading and resolution are separate steps: [`ModelConfig`] is the file as
//! written, [`Topology`] is the fully validated form with every referenced
//! pool given a concrete capacity. All validation happens here, before any
//! simulation task exists.

use crate::error::ConfigError;
use crate::pool::DEFAULT_POOL_CAPACITY;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// One process stanza as written in the model file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    /// Required token count per input pool.
    #[serde(rename = "in", default)]
    pub inputs: BTreeMap<String, u32>,

    /// Produced token count per output pool.
    #[serde(rename = "out", default)]
    pub outputs: BTreeMap<String, u32>,

    /// Fixed processing time per batch, as a humantime string ("2s", "150ms").
    #[serde(deserialize_with = "duration_str::deserialize")]
    pub duration: Duration,

    /// Number of independent replicas contending for the same pools.
    #[serde(default = "default_replicas")]
    pub replicas: u32,
}

fn default_replicas() -> u32 {
    1
}

/// A whole model file: named processes plus optional pool capacities.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Process stanzas, keyed by process name.
    pub processes: BTreeMap<String, ProcessConfig>,

    /// Explicit pool capacities. Pools referenced by a process but absent
    /// here get [`DEFAULT_POOL_CAPACITY`].
    #[serde(default)]
    pub pools: BTreeMap<String, usize>,
}

impl ModelConfig {
    /// Load a model configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Validate the configuration and resolve it into an immutable
    /// [`Topology`] with a concrete capacity for every pool.
    ///
    /// Rejects empty models, zero durations, zero replica counts, zero
    /// per-batch token counts, zero capacities, and any pool too small to
    /// hold a single batch's requirement (which would deadlock instantly).
    pub fn resolve(&self) -> Result<Topology, ConfigError> {
        if self.processes.is_empty() {
            return Err(ConfigError::NoProcesses);
        }

        let mut capacities: BTreeMap<String, usize> = BTreeMap::new();
        for (name, &capacity) in &self.pools {
            if capacity == 0 {
                return Err(ConfigError::ZeroCapacity { pool: name.clone() });
            }
            capacities.insert(name.clone(), capacity);
        }
        // Pools referenced only by a process get the default bound.
        for process in self.processes.values() {
            for pool in process.inputs.keys().chain(process.outputs.keys()) {
                capacities
                    .entry(pool.clone())
                    .or_insert(DEFAULT_POOL_CAPACITY);
            }
        }

        let mut processes = Vec::with_capacity(self.processes.len());
        for (name, config) in &self.processes {
            if config.duration.is_zero() {
                return Err(ConfigError::ZeroDuration {
                    process: name.clone(),
                });
            }
            if config.replicas == 0 {
                return Err(ConfigError::ZeroReplicas {
                    process: name.clone(),
                });
            }
            for (pool, &count) in config.inputs.iter().chain(config.outputs.iter()) {
                if count == 0 {
                    return Err(ConfigError::ZeroCount {
                        process: name.clone(),
                        pool: pool.clone(),
                    });
                }
                let capacity = capacities[pool];
                if count as usize > capacity {
                    return Err(ConfigError::UndersizedPool {
                        pool: pool.clone(),
                        capacity,
                        required: count,
                        process: name.clone(),
                    });
                }
            }
            processes.push(ProcessSpec {
                name: name.clone(),
                duration: config.duration,
                replicas: config.replicas,
                inputs: config.inputs.clone().into_iter().collect(),
                outputs: config.outputs.clone().into_iter().collect(),
            });
        }

        let pools = capacities
            .into_iter()
            .map(|(name, capacity)| PoolSpec { name, capacity })
            .collect();

        Ok(Topology { pools, processes })
    }
}

/// A resolved pool descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSpec {
    pub name: String,
    pub capacity: usize,
}

/// A resolved process descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub name: String,
    pub duration: Duration,
    pub replicas: u32,
    /// Required token count per input pool, sorted by pool name.
    pub inputs: Vec<(String, u32)>,
    /// Produced token count per output pool, sorted by pool name.
    pub outputs: Vec<(String, u32)>,
}

/// A fully resolved, validated model description.
///
/// Both lists are sorted by name. Every pool referenced by any process is
/// present in `pools`; capacities are final. This is the only input
/// [`crate::Model::new`] accepts, so name lookups never happen once a
/// simulation is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub pools: Vec<PoolSpec>,
    pub processes: Vec<ProcessSpec>,
}

mod duration_str {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

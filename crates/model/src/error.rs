//! Error types for model construction.

use std::path::PathBuf;
use thiserror::Error;

/// Errors detected while loading or resolving a model configuration.
///
/// All of these are reported before any simulation task is spawned; a model
/// is never partially constructed. Runtime stalls (a starved consumer, a
/// full pool) are backpressure, not errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The model file could not be read.
    #[error("Failed to read model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The model file is not valid TOML or has the wrong shape.
    #[error("Failed to parse model file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The model declares no processes at all.
    #[error("Model declares no processes")]
    NoProcesses,

    /// A process declared a zero processing duration.
    #[error("Process '{process}': duration must be greater than zero")]
    ZeroDuration { process: String },

    /// A process declared zero replicas.
    #[error("Process '{process}': replicas must be at least 1")]
    ZeroReplicas { process: String },

    /// A process declared a zero token count for one of its pools.
    #[error("Process '{process}': count for pool '{pool}' must be at least 1")]
    ZeroCount { process: String, pool: String },

    /// A pool was given an explicit capacity of zero.
    #[error("Pool '{pool}': capacity must be at least 1")]
    ZeroCapacity { pool: String },

    /// A single batch requires more tokens than its pool can ever hold,
    /// which would deadlock the run immediately.
    #[error(
        "Pool '{pool}': capacity {capacity} is smaller than the {required} \
         tokens process '{process}' moves per batch"
    )]
    UndersizedPool {
        pool: String,
        capacity: usize,
        required: u32,
        process: String,
    },
}

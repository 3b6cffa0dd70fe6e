//! Discrete-event simulation engine for queueing/production networks.
//!
//! A model is a set of process stages connected through bounded, shared
//! [`Pool`]s of virtual timestamps. Each process replica runs as its own
//! tokio task and loops: draw its full input requirement from every input
//! pool, advance its virtual clock, hold for a fixed duration, then emit
//! stamped tokens downstream. Pools are the only synchronization points;
//! a full pool blocks its producers and an empty pool blocks its consumers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Model                            │
//! │                                                          │
//! │   ┌────────┐   pop_many    ┌────────┐   push_many        │
//! │   │ Pool A ├──────────────►│process │─────────────┐      │
//! │   └────────┘               │replica │             ▼      │
//! │   ┌────────┐               │ (task) │        ┌────────┐  │
//! │   │ Pool B ├──────────────►│        │        │ Pool C │  │
//! │   └────────┘               └────────┘        └────────┘  │
//! │                                                          │
//! │   start(horizon) ──► one task per replica ──► RunHandle  │
//! │   report() ──► per-process counters + pool depths        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Time is entirely virtual: the engine runs as fast as the pools allow and
//! never sleeps to pace itself against the wall clock. A run ends when every
//! replica's next batch would finish past the horizon, or when the run's
//! cancellation token fires (see [`RunHandle`]).

mod condition;
mod config;
mod error;
mod model;
mod pool;
mod process;
mod report;

pub use condition::Condition;
pub use config::{ModelConfig, PoolSpec, ProcessConfig, ProcessSpec, Topology};
pub use error::ConfigError;
pub use model::{Model, RunHandle};
pub use pool::{Pool, DEFAULT_POOL_CAPACITY};
pub use report::{PoolReport, ProcessReport, Report};

/// Virtual time: elapsed simulated time since the start of a run.
///
/// Tokens carried by pools, per-replica clocks and run horizons are all
/// `SimTime` values. Distinct from real (wall-clock) time, which the engine
/// only consults for join budgets and condition polling.
pub type SimTime = std::time::Duration;

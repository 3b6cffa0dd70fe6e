//! flowsim CLI
//!
//! Runs discrete-event models of queueing/production networks from TOML
//! descriptions.
//!
//! # Example
//!
//! ```bash
//! # Simulate ten minutes of a production line
//! flowsim run for 10m line.toml
//!
//! # Validate a model without running it
//! flowsim check line.toml
//! ```

mod render;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use flowsim_model::{Model, ModelConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowsim")]
#[command(about = "Discrete-event simulator for queueing networks")]
#[command(version)]
struct Cli {
    /// Log per-batch engine events
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log errors only and suppress the report
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a model
    Run {
        #[command(subcommand)]
        mode: RunMode,
    },

    /// Validate a model file without running it
    Check {
        /// Path to the model TOML file
        model: PathBuf,
    },
}

#[derive(Subcommand)]
enum RunMode {
    /// Run for a span of simulated time
    For {
        /// Simulated time to run for (e.g. "30s", "10m")
        horizon: humantime::Duration,

        /// Path to the model TOML file
        model: PathBuf,

        /// Real time to wait for stalled processes before cancelling
        #[arg(long, default_value = "10s")]
        wall_timeout: humantime::Duration,

        /// Emit the report as JSON instead of text tables
        #[arg(long)]
        json: bool,
    },

    /// Run until the conditions in a condition file hold (reserved)
    Until {
        /// Path to the condition file
        conditions: PathBuf,

        /// Path to the model TOML file
        model: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --verbose/--quiet pick the default level; RUST_LOG still wins.
    let default_filter = if cli.verbose {
        "flowsim_model=debug,flowsim=debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Run {
            mode:
                RunMode::For {
                    horizon,
                    model,
                    wall_timeout,
                    json,
                },
        } => {
            let model = Model::from_file(&model)
                .with_context(|| format!("loading model {}", model.display()))?;

            let report = model.run_for(*horizon, *wall_timeout).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if !cli.quiet {
                print!("{}", render::render_text(&report));
            }
        }

        Commands::Run {
            mode: RunMode::Until { conditions, model },
        } => {
            // The engine exposes a Condition trait but no condition file
            // grammar exists yet; refuse rather than guess.
            let _ = Model::from_file(&model)
                .with_context(|| format!("loading model {}", model.display()))?;
            bail!(
                "condition files are not supported yet ({} ignored); \
                 use `run for <duration>` or the library's Condition trait",
                conditions.display()
            );
        }

        Commands::Check { model } => {
            let config = ModelConfig::from_file(&model)
                .with_context(|| format!("loading model {}", model.display()))?;
            let topology = config
                .resolve()
                .with_context(|| format!("validating model {}", model.display()))?;

            let replicas: u32 = topology.processes.iter().map(|p| p.replicas).sum();
            info!(
                processes = topology.processes.len(),
                replicas,
                pools = topology.pools.len(),
                "Model is valid"
            );
            if !cli.quiet {
                println!(
                    "ok: {} processes ({} replicas), {} pools",
                    topology.processes.len(),
                    replicas,
                    topology.pools.len()
                );
            }
        }
    }

    Ok(())
}

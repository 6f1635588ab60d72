//! Cadence CLI - drive a cooperative worker from a simulated host.
//!
//! - `cadence run` - run the demo workload for a number of frames
//! - `cadence config` - print the effective worker configuration

mod demo;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use cadence_core::{
    Clock, Host, ManualClock, RingTraceSink, SimulatedHost, SystemClock, UpdateFrequency,
    Worker, WorkerConfig,
};

use crate::demo::DemoStats;

/// One host frame at 60 Hz.
const FRAME: Duration = Duration::from_micros(16_667);

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Instruction-budgeted cooperative scheduler", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo workload
    Run {
        /// Host frames to simulate
        #[arg(long, default_value = "600")]
        frames: u64,

        /// Override the per-tick instruction budget
        #[arg(long)]
        budget: Option<u64>,

        /// Pace frames against the wall clock
        #[arg(long)]
        realtime: bool,
    },

    /// Print the effective configuration
    Config,
}

/// Counters accumulated over a whole run.
#[derive(Debug, Default)]
struct RunTotals {
    frames_run: u64,
    steps: u64,
    completed: u64,
    exhausted: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let project_root = match cli.project {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Some(Commands::Run {
            frames,
            budget,
            realtime,
        }) => run_demo(&project_root, frames, budget, realtime).await,
        Some(Commands::Config) => show_config(&project_root),
        None => {
            println!("Cadence - instruction-budgeted cooperative scheduler");
            println!();
            println!("Usage: cadence <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run     Run the demo workload");
            println!("  config  Print the effective configuration");
            println!();
            println!("Run 'cadence --help' for more information.");
            Ok(())
        }
    }
}

fn load_config(project_root: &Path, budget: Option<u64>) -> Result<WorkerConfig> {
    let mut config = WorkerConfig::load_from_project(project_root)
        .with_context(|| format!("Failed to load config from {}", project_root.display()))?;
    if let Some(budget) = budget {
        config = config.with_budget(budget);
        config.validate().context("Invalid --budget")?;
    }
    Ok(config)
}

fn show_config(project_root: &Path) -> Result<()> {
    let config = load_config(project_root, None)?;
    let yaml = serde_yaml::to_string(&config).context("Failed to serialize config")?;
    print!("{yaml}");
    Ok(())
}

async fn run_demo(
    project_root: &Path,
    frames: u64,
    budget: Option<u64>,
    realtime: bool,
) -> Result<()> {
    let config = load_config(project_root, budget)?;
    tracing::info!(
        project = %project_root.display(),
        budget = config.instruction_budget,
        frames,
        realtime,
        "Starting worker"
    );

    let stats = Rc::new(DemoStats::default());
    let sink = Rc::new(RefCell::new(RingTraceSink::new(
        config.trace_capacity,
    )));

    let totals = if realtime {
        let mut worker = build_worker(config, SystemClock::new(), &stats, &sink);
        let mut interval = tokio::time::interval(FRAME);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut totals = RunTotals::default();
        for frame in 0..frames {
            interval.tick().await;
            drive_frame(&mut worker, frame, &mut totals);
        }
        totals
    } else {
        let clock = ManualClock::new();
        let mut worker = build_worker(config, clock.clone(), &stats, &sink);

        let mut totals = RunTotals::default();
        for frame in 0..frames {
            clock.advance(FRAME);
            drive_frame(&mut worker, frame, &mut totals);
        }
        totals
    };

    tracing::info!(
        frames,
        frames_run = totals.frames_run,
        steps = totals.steps,
        completed = totals.completed,
        exhausted = totals.exhausted,
        sweeps = stats.sweeps.get(),
        probes = stats.probes.get(),
        audits = stats.audits.get(),
        "Run finished"
    );

    let sink = sink.borrow();
    if sink.dropped() > 0 {
        tracing::debug!(dropped = sink.dropped(), "Trace ring overflowed");
    }
    for event in sink.events() {
        tracing::debug!(tick = event.tick(), "{event}");
    }

    Ok(())
}

fn build_worker<C: Clock>(
    config: WorkerConfig,
    clock: C,
    stats: &Rc<DemoStats>,
    sink: &Rc<RefCell<RingTraceSink>>,
) -> Worker<C, SimulatedHost> {
    let mut worker = Worker::new(config, clock, SimulatedHost::new());
    worker.set_trace_sink(Box::new(sink.clone()));
    demo::install(&mut worker, stats);

    // The first frame always runs.
    worker
        .host_mut()
        .set_update_frequency(UpdateFrequency::ONCE);
    worker
}

fn drive_frame<C: Clock>(
    worker: &mut Worker<C, SimulatedHost>,
    frame: u64,
    totals: &mut RunTotals,
) {
    if !worker.host().should_run(frame) {
        return;
    }

    worker.host_mut().begin_tick();
    let report = worker.run();

    totals.frames_run += 1;
    totals.steps += report.steps;
    totals.completed += report.completed;
    if report.budget_exhausted {
        totals.exhausted += 1;
    }

    if report.steps > 0 || report.materialized > 0 {
        tracing::debug!(
            frame,
            cadence = %worker.host().update_frequency(),
            "{}",
            report.summary()
        );
    }
}

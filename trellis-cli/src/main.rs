//! Trellis CLI — run, plan and inspect hyperparameter sweeps.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use trellis_core::model::ShallowNetFactory;
use trellis_core::sweep::SweepRunner;
use trellis_core::tracking::ExperimentTracker;
use trellis_core::{SweepFile, load_sweep_file};

/// Trellis: hyperparameter sweeps for image classifiers
#[derive(Parser, Debug)]
#[command(name = "trellis", version, about, long_about = None)]
struct Cli {
    /// Sweep file (TOML) with settings and the search space
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Execute the sweep: one training run per grid point
    Run,
    /// Expand the grid and print the configurations without training
    Plan,
    /// List tracked runs
    Runs,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let sweep_file = load_sweep_file(cli.config.as_deref())?;
    tracing::debug!(
        sweep = %sweep_file.settings.sweep_name,
        data_root = %sweep_file.settings.data_root.display(),
        "sweep file loaded"
    );

    match cli.command {
        Commands::Run => run_sweep(sweep_file),
        Commands::Plan => plan_sweep(sweep_file),
        Commands::Runs => list_runs(sweep_file),
    }
}

fn run_sweep(sweep_file: SweepFile) -> anyhow::Result<()> {
    let SweepFile { settings, space } = sweep_file;
    let factory = ShallowNetFactory::new(settings.seed);
    let runner = SweepRunner::new(settings, factory);
    let summary = runner.run(&space)?;

    if summary.runs.is_empty() {
        println!("Search space is empty: no runs executed.");
        return Ok(());
    }

    println!("Completed {} run(s):", summary.runs.len());
    for run in &summary.runs {
        println!(
            "  {}  {}  epochs={:<3}  accuracy={:.4}",
            run.id,
            run.params.optimizer.name(),
            run.params.epochs,
            run.metrics.test_accuracy
        );
    }
    Ok(())
}

fn plan_sweep(sweep_file: SweepFile) -> anyhow::Result<()> {
    let SweepFile { settings, space } = sweep_file;

    // Resolve derivable fields the same way a real run would: shape from
    // settings, class count from the scanned train split.
    let options = trellis_core::data::FeedOptions::from_settings(&settings);
    let train = trellis_core::data::DataFeed::scan(&settings.train_dir(), options)?;
    let space = space.resolved(&settings, train.num_classes());

    println!(
        "{} configuration(s) over {} class(es):",
        space.cardinality(),
        train.num_classes()
    );
    for (index, config) in space.configurations().enumerate() {
        println!("  [{}] {}", index + 1, serde_json::to_string(&config)?);
    }
    Ok(())
}

fn list_runs(sweep_file: SweepFile) -> anyhow::Result<()> {
    let tracker = ExperimentTracker::new(sweep_file.settings.tracking_root);
    let runs = tracker.list()?;
    if runs.is_empty() {
        println!("No tracked runs.");
        return Ok(());
    }

    println!("{} tracked run(s):", runs.len());
    for run in runs {
        println!(
            "  {}  {}  {}  {}  epochs={:<3}  accuracy={:.4}",
            run.id,
            run.created_at.format("%Y-%m-%d %H:%M:%S"),
            run.sweep_name,
            run.params.optimizer.name(),
            run.params.epochs,
            run.metrics.test_accuracy
        );
    }
    Ok(())
}

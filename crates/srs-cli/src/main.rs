//! srs: command-line driver for the SRS surface filter.
//!
//! Runs the filter on procedural phantom surfaces and works with parameter
//! files. Mesh files are neither read nor written; the filter is meant to be
//! embedded in a host application that owns the scene.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=srs_filter=info` - stage summaries and progress messages
//! - `RUST_LOG=srs_filter=debug` - per-sweep and per-stage details
//! - `RUST_LOG=srs_mesh::timing=debug` - operation timing
//!
//! # Example
//!
//! ```bash
//! # Solidify a fractured phantom and print a summary
//! srs run fractured --radius 25 --mode solidified
//!
//! # Check a parameter file, then use it
//! srs params filter.toml
//! srs run sphere --params filter.toml --format json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use srs_filter::{FilterError, FilterMode, OutputType};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::run::RunStatus;

/// srs - shrinkwrap, raycast and solidify fractured segmentation surfaces.
#[derive(Parser)]
#[command(name = "srs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the filter on a phantom surface
    Run(commands::run::RunArgs),

    /// Print default parameters, or validate a parameter file
    Params {
        /// TOML or JSON parameter file to validate
        file: Option<PathBuf>,
    },
}

/// Surface to feed the filter.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Phantom {
    /// A closed UV sphere
    Sphere,
    /// An axis-aligned cube
    Box,
    /// A sphere broken into two fragments across its equator
    Fractured,
}

/// Last stage to run.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    ConvexHull,
    Raycasts,
    DeepHull,
    NonManifold,
    Solidified,
}

impl From<ModeArg> for FilterMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::ConvexHull => FilterMode::ConvexHull,
            ModeArg::Raycasts => FilterMode::Raycasts,
            ModeArg::DeepHull => FilterMode::DeepHull,
            ModeArg::NonManifold => FilterMode::NonManifold,
            ModeArg::Solidified => FilterMode::Solidified,
        }
    }
}

/// Where the result goes.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputArg {
    /// A new model named after the segment
    Model,
    /// Replace the segment's closed surface
    Segmentation,
}

impl From<OutputArg> for OutputType {
    fn from(output: OutputArg) -> Self {
        match output {
            OutputArg::Model => OutputType::Model,
            OutputArg::Segmentation => OutputType::Segmentation,
        }
    }
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "srs_filter=info,srs_mesh=info",
            2 => "srs_filter=debug,srs_mesh=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn report_error(e: &anyhow::Error) {
    if let Some(filter_err) = e.downcast_ref::<FilterError>() {
        eprintln!("{}: {}", "Error".red().bold(), filter_err);
        eprintln!("  {}: {}", "Code".cyan(), filter_err.code());
        eprintln!(
            "  {}: {}",
            "Suggestion".green(),
            filter_err.recovery_suggestion()
        );
    } else {
        eprintln!("{}: {}", "Error".red().bold(), e);
    }
    for cause in e.chain().skip(1) {
        eprintln!("  {}: {}", "Caused by".yellow(), cause);
    }
}

fn main() -> ExitCode {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result: Result<RunStatus> = match &cli.command {
        Commands::Run(args) => commands::run::run(args, &cli),
        Commands::Params { file } => {
            commands::params::run(file.as_deref(), &cli).map(|()| RunStatus::Completed)
        }
    };

    match result {
        Ok(RunStatus::Completed) => ExitCode::SUCCESS,
        Ok(RunStatus::Cancelled) => ExitCode::from(2),
        Err(e) => {
            if !cli.quiet {
                report_error(&e);
            }
            ExitCode::FAILURE
        }
    }
}

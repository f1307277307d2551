//! CIA CLI - change impact analysis for C and C++ declaration graphs
//!
//! Compares two snapshots of a project's declaration graph and ranks every
//! declaration of the new snapshot by how strongly it is affected.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Parse and validate a factor (must be between 0.0 and 1.0)
fn parse_unit(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("value must be between 0.0 and 1.0, got {}", value));
    }
    Ok(value)
}

fn parse_threads(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("threads must be at least 1".to_string()),
        Ok(value) => Ok(value),
        Err(_) => Err(format!("'{}' is not a valid thread count", s)),
    }
}

mod commands;
mod config;
mod output;

use commands::*;
use config::CiaConfig;
use output::OutputFormat;

/// Change impact analysis for C and C++ projects.
///
/// CIA diffs two declaration-graph snapshots of a project, classifies
/// every declaration as added, removed, changed or unchanged, and weights
/// each declaration of the new snapshot by how strongly the changes reach it.
#[derive(Parser)]
#[command(name = "cia")]
#[command(author, version)]
#[command(about = "Change impact analysis for C and C++ declaration graphs")]
#[command(propagate_version = true)]
#[command(next_help_heading = "Options")]
#[command(after_help = "Examples:
  cia diff v1.json v2.json           What changed between two snapshots?
  cia diff v1.json v2.json --save d  Keep the result for later
  cia report d                       Render a saved diff
  cia impact v2.json --changed io::read
  cia show v2.json --cycles")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Fail on .ciarc.toml errors instead of silently using defaults
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two snapshots and weight the impact of every change
    #[command(visible_alias = "d")]
    Diff {
        /// Snapshot of the old version
        old: PathBuf,

        /// Snapshot of the new version
        new: PathBuf,

        /// Worker threads for impact propagation (default: all cores)
        #[arg(short = 'j', long, value_parser = parse_threads)]
        threads: Option<usize>,

        /// Skip impact propagation
        #[arg(long)]
        no_impact: bool,

        /// Per-hop decay of the fixed policy (0.0-1.0)
        #[arg(long, value_parser = parse_unit)]
        decay: Option<f64>,

        /// Stop following hops whose influence drops below this (0.0-1.0)
        #[arg(long, value_parser = parse_unit)]
        min_influence: Option<f64>,

        /// Write the diff to this file
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// List unchanged declarations too
        #[arg(short, long)]
        all: bool,
    },

    /// Impact weights for a set of changed declarations
    #[command(visible_alias = "i")]
    Impact {
        /// Snapshot containing the declarations
        snapshot: PathBuf,

        /// Unique names of the changed declarations
        #[arg(short, long, required = true, num_args = 1..)]
        changed: Vec<String>,

        /// Worker threads (default: all cores)
        #[arg(short = 'j', long, value_parser = parse_threads)]
        threads: Option<usize>,

        /// Only list the K most impacted declarations
        #[arg(short = 'n', long)]
        top: Option<usize>,

        /// Per-hop decay of the fixed policy (0.0-1.0)
        #[arg(long, value_parser = parse_unit)]
        decay: Option<f64>,

        /// Stop following hops whose influence drops below this (0.0-1.0)
        #[arg(long, value_parser = parse_unit)]
        min_influence: Option<f64>,
    },

    /// Summarize a snapshot: counts, kinds and declaration tree
    Show {
        /// Snapshot to inspect
        snapshot: PathBuf,

        /// Also list dependency cycles
        #[arg(long)]
        cycles: bool,
    },

    /// Render a diff saved with `cia diff --save`
    Report {
        /// Saved diff file
        diff_file: PathBuf,

        /// List unchanged declarations too
        #[arg(short, long)]
        all: bool,
    },
}

/// Setup logging based on verbosity flags
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration from .ciarc.toml
    let config = CiaConfig::load(Path::new("."), cli.strict)?;

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    // Apply color override from config if set
    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    match command {
        Commands::Diff {
            old,
            new,
            threads,
            no_impact,
            decay,
            min_influence,
            save,
            all,
        } => {
            let options = diff::DiffOptions {
                threads,
                no_impact,
                decay,
                min_influence,
                save: save.as_deref(),
                all,
            };
            diff::run(&old, &new, &options, &config, format)
        }
        Commands::Impact {
            snapshot,
            changed,
            threads,
            top,
            decay,
            min_influence,
        } => {
            let options = impact::ImpactOptions {
                threads,
                decay,
                min_influence,
                top,
            };
            impact::run(&snapshot, &changed, &options, &config, format)
        }
        Commands::Show { snapshot, cycles } => show::run(&snapshot, cycles, format),
        Commands::Report { diff_file, all } => report::run(&diff_file, all, &config, format),
    }
}

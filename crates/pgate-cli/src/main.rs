//! # pgate CLI entry point
//!
//! Parses command-line arguments, layers configuration, sets up logging and
//! dispatches to the subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pgate_cli::evaluate::{run_evaluate, EvaluateArgs};
use pgate_cli::merge::{run_merge, MergeArgs};
use pgate_cli::validate::{run_validate, ValidateArgs};
use pgate_cli::waivers::{run_waivers, WaiversArgs};
use pgate_cli::{CliConfig, LogFormat, EXIT_INPUT_ERROR};

/// Governance policy gate.
///
/// Merges an organization baseline with a repository override, evaluates
/// normalized evidence against the effective policy and writes a
/// deterministic decision record.
#[derive(Parser, Debug)]
#[command(name = "pgate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true, env = "PGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of schema overrides.
    #[arg(long, global = true)]
    schema_dir: Option<PathBuf>,

    /// Output directory for the effective policy and decision record.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Log line format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge a baseline and an override into the effective policy.
    Merge(MergeArgs),

    /// Evaluate evidence against an effective policy.
    Evaluate(EvaluateArgs),

    /// Validate documents against their schemas.
    Validate(ValidateArgs),

    /// Audit a waiver list for expired and expiring entries.
    Waivers(WaiversArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(EXIT_INPUT_ERROR);
        }
    };
    if let Some(dir) = &cli.schema_dir {
        config.schema_dir = Some(dir.clone());
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    init_tracing(cli.verbose, config.log_format);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "pgate starting");

    let result = match &cli.command {
        Commands::Merge(args) => run_merge(args, &config),
        Commands::Evaluate(args) => run_evaluate(args, &config),
        Commands::Validate(args) => run_validate(args, &config),
        Commands::Waivers(args) => run_waivers(args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_INPUT_ERROR)
        }
    }
}

/// Logs go to stderr so stdout stays clean for decision and policy output.
/// `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

//! ers - evidence record verifier
//!
//! Checks detached documents against RFC 4998 / RFC 6283 evidence records
//! supplied in JSON interchange form.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ers_core::config::VerifierConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// ers - evidence record verifier
#[derive(Parser, Debug)]
#[command(name = "ers")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a verifier configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify documents against an evidence record
    Verify(commands::verify::VerifyArgs),

    /// Show the structure of an evidence record
    Inspect(commands::inspect::InspectArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = match &cli.config {
        Some(path) => VerifierConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => VerifierConfig::default(),
    };

    // Commands return their exit code; 2 means the record failed
    // verification, distinct from errors reading it.
    let exit_code = match cli.command {
        Commands::Verify(args) => commands::verify::run_verify(&args, &config),
        Commands::Inspect(args) => commands::inspect::run_inspect(&args, &config),
    };
    std::process::exit(i32::from(exit_code));
}

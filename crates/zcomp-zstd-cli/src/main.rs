//! zcomp-zstd CLI - inspect and exercise the per-core zstd backend.

#![deny(missing_docs)]
#![deny(clippy::panic)]
#![warn(clippy::all, clippy::pedantic)]

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use zcomp_zstd_core::BackendConfig;

/// zcomp-zstd: per-core zstd compression backend
#[derive(Parser)]
#[command(name = "zcomp-zstd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Backend config file (TOML); defaults to /etc/zcomp-zstd.conf if present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show workspace sizes and core layout
    Info,

    /// Round-trip sample pages through every core's context
    Selftest(commands::SelftestArgs),

    /// Measure compression and decompression throughput
    Benchmark(commands::BenchmarkArgs),
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BackendConfig> {
    let config = match path {
        Some(path) => BackendConfig::load(path)?,
        None => BackendConfig::load_default()?,
    };
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Commands::Info => commands::info(&config, cli.format),
        Commands::Selftest(args) => commands::selftest(&args, config, cli.format),
        Commands::Benchmark(args) => commands::benchmark(&args, config, cli.format),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

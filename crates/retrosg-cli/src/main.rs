//! Retrosg CLI - measurement driver for safeguarded-stimulus analysis.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retrosg")]
#[command(author, version, about = "Retrospective stimulus safeguarding toolkit", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deconvolve a recording into a raw impulse response
    Deconvolve(commands::deconvolve::DeconvolveArgs),

    /// Window and taper a measurement into a refined impulse response
    Refine(commands::refine::RefineArgs),

    /// Safeguard a stimulus at a given threshold
    Safeguard(commands::safeguard::SafeguardArgs),

    /// Search for the safeguard threshold behind a recording
    Optimize(commands::optimize::OptimizeArgs),

    /// Fractional-octave smoothed level of a response
    Bands(commands::bands::BandsArgs),

    /// Show WAV file metadata
    Info(commands::info::InfoArgs),

    /// Write the default analysis configuration
    InitConfig(commands::init_config::InitConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Deconvolve(args) => commands::deconvolve::run(args),
        Commands::Refine(args) => commands::refine::run(args),
        Commands::Safeguard(args) => commands::safeguard::run(args),
        Commands::Optimize(args) => commands::optimize::run(args),
        Commands::Bands(args) => commands::bands::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::InitConfig(args) => commands::init_config::run(args),
    }
}

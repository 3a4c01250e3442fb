//! Write the default analysis configuration.

use clap::Args;
use retrosg_config::AnalysisConfig;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitConfigArgs {
    /// Output TOML file
    #[arg(short, long, default_value = "retrosg.toml")]
    output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
}

pub fn run(args: InitConfigArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            args.output.display()
        );
    }
    AnalysisConfig::default().save(&args.output)?;
    println!("Wrote default configuration to {}", args.output.display());
    Ok(())
}

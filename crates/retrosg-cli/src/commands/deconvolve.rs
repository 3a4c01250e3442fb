//! Raw impulse response extraction.

use super::common::{output_spec, read_pair};
use clap::Args;
use retrosg_analysis::{DeconvolveParams, SingularityPolicy, deconvolve};
use retrosg_io::write_signal;
use std::path::PathBuf;

#[derive(Args)]
pub struct DeconvolveArgs {
    /// Recorded WAV file (one or two channels)
    #[arg(long, value_name = "RECORDED")]
    recorded: PathBuf,

    /// Played stimulus WAV file
    #[arg(long, value_name = "PLAYED")]
    played: PathBuf,

    /// Output impulse response WAV file
    #[arg(short, long)]
    output: PathBuf,

    /// Floor near-zero stimulus bins at this fraction of the peak magnitude
    #[arg(long, value_name = "REL")]
    floor: Option<f64>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: DeconvolveArgs) -> anyhow::Result<()> {
    let (recorded, played, spec) = read_pair(&args.recorded, &args.played)?;

    let singularity = match args.floor {
        Some(relative) if !(relative.is_finite() && relative > 0.0 && relative < 1.0) => {
            anyhow::bail!("--floor must be in (0, 1), got {relative}");
        }
        Some(relative) => SingularityPolicy::Floor { relative },
        None => SingularityPolicy::Propagate,
    };

    println!("Deconvolving...");
    let result = deconvolve(&recorded, &played, &DeconvolveParams { singularity })?;

    let singular: usize = result.singular_bins.iter().map(Vec::len).sum();
    if result.has_singularities() {
        println!("  Singular stimulus bins: {singular}");
        if singularity == SingularityPolicy::Propagate && !result.impulse_response.is_finite() {
            println!("  Warning: response is not finite; retry with --floor");
        }
    }

    write_signal(&args.output, &result.impulse_response, output_spec(spec, args.bit_depth)?)?;
    println!(
        "Wrote impulse response to {} ({} ch, {} samples)",
        args.output.display(),
        result.impulse_response.num_channels(),
        result.impulse_response.len()
    );

    Ok(())
}

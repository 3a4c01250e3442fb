//! Refined impulse response: deconvolve, window and taper.
//!
//! Each run is one pass of the accept/reject loop. To try other cutoffs,
//! run again with new `--low-cut`/`--high-cut` values.

use super::common::{
    AnalysisOverrides, load_config, output_spec, read_pair, sibling_path, source_name,
};
use clap::Args;
use retrosg_analysis::{deconvolve, refine};
use retrosg_io::{Provenance, write_provenance, write_signal};
use std::path::PathBuf;

#[derive(Args)]
pub struct RefineArgs {
    /// Recorded WAV file (one or two channels)
    #[arg(long, value_name = "RECORDED")]
    recorded: PathBuf,

    /// Played stimulus WAV file
    #[arg(long, value_name = "PLAYED")]
    played: PathBuf,

    /// Output refined impulse response WAV file
    #[arg(short, long)]
    output: PathBuf,

    /// Analysis configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: AnalysisOverrides,

    /// Channel whose peak anchors the windows
    #[arg(long)]
    channel: Option<usize>,

    /// Safeguard threshold of the played stimulus, kept in the provenance record
    #[arg(long, allow_hyphen_values = true)]
    threshold_db: Option<f64>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: RefineArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.overrides.apply(&mut config);
    if let Some(channel) = args.channel {
        config.windows.reference_channel = channel;
    }

    let (recorded, played, spec) = read_pair(&args.recorded, &args.played)?;
    let fs = recorded.sample_rate();
    config.validate(fs)?;

    let raw = deconvolve(&recorded, &played, &config.deconvolve_params())?;
    let singular: usize = raw.singular_bins.iter().map(Vec::len).sum();

    let params = config.refine_params();
    let refined = refine(&raw.impulse_response, &params)?;
    let windows = refined.windows;

    println!();
    println!("Refinement");
    println!("----------");
    println!(
        "  Peak:          sample {} ({:.4}s) on channel {}",
        refined.peak_index,
        refined.peak_index as f64 / fs,
        params.reference_channel
    );
    println!(
        "  LTI window:    [{}, {}) ({:.3}s)",
        windows.lti.start,
        windows.lti.end(),
        windows.lti.length as f64 / fs
    );
    println!("  Noise window:  [{}, {})", windows.noise.start, windows.noise.end());
    println!(
        "  Taper band:    {:.1} Hz - {:.1} Hz",
        params.band.low_cut_hz, params.band.high_cut_hz
    );
    println!("  Singular bins: {singular}");
    println!("  Imag residual: {:.3e}", refined.imaginary_residual);

    let spec = output_spec(spec, args.bit_depth)?;
    write_signal(&args.output, &refined.impulse_response, spec)?;
    let noise_path = sibling_path(&args.output, "noise");
    write_signal(&noise_path, &refined.noise_response, spec)?;

    let provenance = Provenance {
        source: source_name(&args.recorded),
        low_cut_hz: params.band.low_cut_hz,
        high_cut_hz: params.band.high_cut_hz,
        pre_delay_s: params.pre_delay_s,
        window_duration_s: params.window_duration_s,
        threshold_db: args.threshold_db,
        peak_index: refined.peak_index,
        sample_rate: fs,
    };
    let sidecar = write_provenance(&args.output, &provenance)?;

    println!();
    println!("Wrote refined response to {}", args.output.display());
    println!("Wrote noise response to {}", noise_path.display());
    println!("Wrote provenance to {}", sidecar.display());

    Ok(())
}

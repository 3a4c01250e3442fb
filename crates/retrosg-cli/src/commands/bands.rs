//! Fractional-octave level of a response.

use super::common::{load_config, read_input};
use clap::Args;
use retrosg_analysis::{Spectrum, smoothed_level_db};
use std::path::PathBuf;

#[derive(Args)]
pub struct BandsArgs {
    /// Impulse response WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Channel to analyze
    #[arg(long, default_value = "0")]
    channel: usize,

    /// Analysis configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Channel bandwidth in octaves
    #[arg(long)]
    bandwidth: Option<f64>,

    /// Channel spacing in octaves
    #[arg(long)]
    step: Option<f64>,

    /// Output CSV file (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: BandsArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let bandwidth = args.bandwidth.unwrap_or(config.smoothing.bandwidth_octaves);
    let step = args.step.unwrap_or(config.smoothing.step_octaves);

    let (input, _) = read_input(&args.input)?;
    let spectrum = Spectrum::from_real(input.channel(args.channel)?, input.sample_rate());
    let (centers, levels) = smoothed_level_db(&spectrum, bandwidth, step)?;

    println!();
    println!("{:>12}  {:>10}", "Center (Hz)", "Level (dB)");
    for (center, level) in centers.iter().zip(&levels) {
        println!("{center:>12.1}  {level:>10.2}");
    }

    if let Some(output_path) = args.output {
        let mut csv = String::new();
        csv.push_str("center_hz,level_db\n");
        for (center, level) in centers.iter().zip(&levels) {
            csv.push_str(&format!("{:.3},{:.3}\n", center, level));
        }
        std::fs::write(&output_path, csv)?;
        println!("\nWrote {} bands to {}", centers.len(), output_path.display());
    }

    Ok(())
}

//! Reference safeguard of a stimulus file.

use super::common::{output_spec, read_input};
use clap::Args;
use retrosg_analysis::{Safeguard, Signal, SpectralFloorSafeguard};
use retrosg_io::write_signal;
use std::path::PathBuf;

#[derive(Args)]
pub struct SafeguardArgs {
    /// Stimulus WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output safeguarded WAV file
    #[arg(short, long)]
    output: PathBuf,

    /// Lowest spectral level relative to the peak, in dB
    #[arg(long, allow_hyphen_values = true)]
    threshold_db: f64,

    /// Bins above this frequency are left alone
    #[arg(long, default_value = "20000")]
    high_freq_limit: f64,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: SafeguardArgs) -> anyhow::Result<()> {
    let (input, spec) = read_input(&args.input)?;
    let fs = input.sample_rate();

    let mut channels = Vec::with_capacity(input.num_channels());
    for (index, samples) in input.channels().iter().enumerate() {
        let output = SpectralFloorSafeguard.safeguard(
            samples,
            fs,
            fs,
            args.threshold_db,
            args.high_freq_limit,
        )?;
        println!(
            "  Channel {index}: already above floor from {:.1} Hz to {:.1} Hz",
            output.params.f_low, output.params.f_high
        );
        channels.push(output.signal);
    }

    let safeguarded = Signal::new(channels, fs)?;
    write_signal(&args.output, &safeguarded, output_spec(spec, args.bit_depth)?)?;
    println!(
        "Wrote stimulus safeguarded at {} dB to {}",
        args.threshold_db,
        args.output.display()
    );

    Ok(())
}

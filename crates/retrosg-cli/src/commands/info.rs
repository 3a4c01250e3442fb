//! Display WAV file metadata.

use clap::Args;
use retrosg_io::{WavFormat, read_wav_info};

/// Display WAV file information.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the WAV file
    pub file: std::path::PathBuf,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let info = read_wav_info(&args.file)?;

    let format_str = match info.format {
        WavFormat::Pcm => "PCM",
        WavFormat::IeeeFloat => "IEEE Float",
    };

    println!("File:        {}", args.file.display());
    println!("Format:      {} {}-bit", format_str, info.bits_per_sample);
    println!("Channels:    {}", info.channels);
    println!("Sample Rate: {} Hz", info.sample_rate);
    println!(
        "Duration:    {:.3}s ({} frames)",
        info.duration_secs, info.num_frames
    );

    let sidecar = retrosg_io::provenance_path(&args.file);
    if sidecar.exists() {
        let provenance = retrosg_io::read_provenance(&args.file)?;
        println!("Source:      {}", provenance.source);
        println!(
            "Band:        {:.1} Hz - {:.1} Hz",
            provenance.low_cut_hz, provenance.high_cut_hz
        );
        println!(
            "Windows:     {:.3}s pre-delay, {:.3}s long",
            provenance.pre_delay_s, provenance.window_duration_s
        );
        println!("Peak:        sample {}", provenance.peak_index);
        if let Some(threshold) = provenance.threshold_db {
            println!("Threshold:   {threshold} dB");
        }
    }

    Ok(())
}

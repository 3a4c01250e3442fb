//! Shared CLI helpers used across multiple commands.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use retrosg_analysis::Signal;
use retrosg_config::AnalysisConfig;
use retrosg_io::{WavSpec, read_signal};
use std::path::{Path, PathBuf};

/// Load the configuration at `path`, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(path) => {
            let config = AnalysisConfig::load(path)?;
            tracing::debug!(path = %path.display(), "loaded analysis config");
            Ok(config)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Command-line overrides of the `[taper]` and `[windows]` settings.
#[derive(Args, Debug, Default)]
pub struct AnalysisOverrides {
    /// Low taper cutoff in Hz
    #[arg(long)]
    pub low_cut: Option<f64>,

    /// High taper cutoff in Hz
    #[arg(long)]
    pub high_cut: Option<f64>,

    /// Seconds kept before the main peak
    #[arg(long)]
    pub pre_delay: Option<f64>,

    /// Analysis window length in seconds
    #[arg(long)]
    pub window: Option<f64>,
}

impl AnalysisOverrides {
    /// Write every given override into `config`.
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(low) = self.low_cut {
            config.taper.low_cut_hz = low;
        }
        if let Some(high) = self.high_cut {
            config.taper.high_cut_hz = high;
        }
        if let Some(pre_delay) = self.pre_delay {
            config.windows.pre_delay_s = pre_delay;
        }
        if let Some(window) = self.window {
            config.windows.window_duration_s = window;
        }
    }
}

/// Read a WAV file and report its layout.
pub fn read_input(path: &Path) -> anyhow::Result<(Signal, WavSpec)> {
    let (signal, spec) = read_signal(path)?;
    println!(
        "Read {}: {} ch, {} Hz, {} samples ({:.2}s)",
        path.display(),
        signal.num_channels(),
        spec.sample_rate,
        signal.len(),
        signal.duration_secs()
    );
    Ok((signal, spec))
}

/// Read a recorded/played pair, checking that the two can be deconvolved.
pub fn read_pair(recorded: &Path, played: &Path) -> anyhow::Result<(Signal, Signal, WavSpec)> {
    let (recorded_signal, spec) = read_input(recorded)?;
    let (played_signal, _) = read_input(played)?;

    if recorded_signal.sample_rate() != played_signal.sample_rate() {
        anyhow::bail!(
            "Sample rate mismatch: {} vs {}",
            recorded_signal.sample_rate(),
            played_signal.sample_rate()
        );
    }
    if recorded_signal.len() != played_signal.len() {
        anyhow::bail!(
            "Length mismatch: recorded {} samples, played {} samples",
            recorded_signal.len(),
            played_signal.len()
        );
    }
    Ok((recorded_signal, played_signal, spec))
}

/// Output spec with the bit depth requested on the command line.
pub fn output_spec(input: WavSpec, bit_depth: u16) -> anyhow::Result<WavSpec> {
    if !matches!(bit_depth, 16 | 24 | 32) {
        anyhow::bail!("Unsupported bit depth {bit_depth} (expected 16, 24, or 32)");
    }
    Ok(WavSpec {
        bits_per_sample: bit_depth,
        ..input
    })
}

/// `dir/stem_suffix.ext` next to `path`.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    };
    path.with_file_name(file_name)
}

/// File name of `path` for provenance records.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Progress bar over `len` steps.
pub fn progress_bar(len: usize) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

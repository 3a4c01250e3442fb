//! Retrospective threshold search.

use super::common::{AnalysisOverrides, load_config, progress_bar, read_input};
use clap::Args;
use retrosg_analysis::{
    CancellationToken, SpectralFloorSafeguard, ThresholdOptimizer, build_windows,
};
use retrosg_config::{AnalysisConfig, ThresholdRange};
use retrosg_io::{Provenance, provenance_path, read_provenance, save_record};
use std::path::PathBuf;

#[derive(Args)]
pub struct OptimizeArgs {
    /// Raw recording made with a stimulus of unknown threshold
    #[arg(long, value_name = "RECORDED")]
    recorded: PathBuf,

    /// Unsafeguarded stimulus template
    #[arg(long, value_name = "TEMPLATE")]
    template: PathBuf,

    /// Reference refined impulse response (output of `retrosg refine`)
    #[arg(long, value_name = "REFERENCE")]
    reference: PathBuf,

    /// Output JSON result file
    #[arg(short, long)]
    output: PathBuf,

    /// Analysis configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Threshold sweep as start:stop:step in dB (e.g. "-80:-20:5")
    #[arg(long, allow_hyphen_values = true)]
    thresholds: Option<ThresholdRange>,

    #[command(flatten)]
    overrides: AnalysisOverrides,

    /// Peak index of the reference's raw response (read from its provenance record by default).
    /// Without a provenance record, the band and windows come from the config and flags.
    #[arg(long)]
    peak_index: Option<usize>,

    /// Channel of the recording and reference to compare
    #[arg(long, default_value = "0")]
    channel: usize,
}

pub fn run(args: OptimizeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(range) = args.thresholds {
        config.optimizer.set_range(range);
    }

    let (recorded, _) = read_input(&args.recorded)?;
    let (template, _) = read_input(&args.template)?;
    let (reference, _) = read_input(&args.reference)?;
    let fs = recorded.sample_rate();
    if template.sample_rate() != fs || reference.sample_rate() != fs {
        anyhow::bail!(
            "Sample rate mismatch: recorded {} Hz, template {} Hz, reference {} Hz",
            fs,
            template.sample_rate(),
            reference.sample_rate()
        );
    }

    // Candidates must be windowed and tapered exactly like the reference.
    let provenance = if provenance_path(&args.reference).exists() || args.peak_index.is_none() {
        Some(read_provenance(&args.reference).map_err(|e| {
            anyhow::anyhow!(
                "No provenance for {} ({e}). Pass --peak-index or keep the provenance record from `retrosg refine`.",
                args.reference.display()
            )
        })?)
    } else {
        None
    };
    match &provenance {
        Some(provenance) => adopt_provenance(&mut config, &args.overrides, provenance, fs)?,
        None => args.overrides.apply(&mut config),
    }
    config.validate(fs)?;

    let peak_index = match (args.peak_index, &provenance) {
        (Some(index), _) => index,
        (None, Some(provenance)) => provenance.peak_index,
        (None, None) => anyhow::bail!("No peak index for {}", args.reference.display()),
    };
    let windows = build_windows(
        peak_index,
        config.windows.pre_delay_s,
        config.windows.window_duration_s,
        fs,
        recorded.len(),
    )?;
    let params = config.optimize_params(windows.lti);
    let count = params.thresholds_db.len();

    println!(
        "Sweeping {} thresholds from {} dB to {} dB (LTI window [{}, {}))",
        count,
        config.optimizer.threshold_start_db,
        config.optimizer.threshold_stop_db,
        windows.lti.start,
        windows.lti.end()
    );

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        println!("\nStopping after the current candidate...");
        handler_token.cancel();
    })?;

    let pb = progress_bar(count)?;
    let bar = pb.clone();
    let result = ThresholdOptimizer::new(&SpectralFloorSafeguard, params)
        .with_cancellation(token)
        .on_progress(move |candidate| {
            bar.set_message(format!("{} dB", candidate.threshold_db));
            bar.inc(1);
        })
        .run(
            reference.channel(args.channel)?,
            recorded.channel(args.channel)?,
            // The stimulus is played from its first channel.
            template.channel(0)?,
            fs,
        );
    pb.finish_and_clear();
    let result = result?;

    println!();
    println!("{:>14}  {:>10}  {:>8}", "Threshold (dB)", "Error (dB)", "Scale");
    for candidate in &result.candidates {
        match (candidate.error_db, candidate.scale) {
            (Some(error_db), Some(scale)) => println!(
                "{:>14.2}  {:>10.2}  {:>8.3}",
                candidate.threshold_db, error_db, scale
            ),
            _ => println!(
                "{:>14.2}  {:>10}  {}",
                candidate.threshold_db,
                "-",
                candidate.reason.as_deref().unwrap_or("excluded")
            ),
        }
    }

    println!();
    println!(
        "Best threshold: {} dB (error {:.2} dB, scale {:.3})",
        result.best_threshold_db, result.best_error_db, result.best_scale
    );

    save_record(&args.output, &result)?;
    println!("Wrote result to {}", args.output.display());

    Ok(())
}

/// Take the taper band and windows from the reference's provenance.
///
/// An explicit override has to agree with the recorded value.
fn adopt_provenance(
    config: &mut AnalysisConfig,
    overrides: &AnalysisOverrides,
    provenance: &Provenance,
    sample_rate: f64,
) -> anyhow::Result<()> {
    if provenance.sample_rate != sample_rate {
        anyhow::bail!(
            "Reference was refined at {} Hz, recording is {} Hz",
            provenance.sample_rate,
            sample_rate
        );
    }

    let settings = [
        ("--low-cut", overrides.low_cut, provenance.low_cut_hz),
        ("--high-cut", overrides.high_cut, provenance.high_cut_hz),
        ("--pre-delay", overrides.pre_delay, provenance.pre_delay_s),
        ("--window", overrides.window, provenance.window_duration_s),
    ];
    for (flag, given, recorded) in settings {
        if let Some(given) = given
            && given != recorded
        {
            anyhow::bail!(
                "{flag} {given} disagrees with the reference, which was refined with {recorded}"
            );
        }
    }

    if config.taper.low_cut_hz != provenance.low_cut_hz
        || config.taper.high_cut_hz != provenance.high_cut_hz
        || config.windows.pre_delay_s != provenance.pre_delay_s
        || config.windows.window_duration_s != provenance.window_duration_s
    {
        tracing::info!(
            low_cut_hz = provenance.low_cut_hz,
            high_cut_hz = provenance.high_cut_hz,
            pre_delay_s = provenance.pre_delay_s,
            window_duration_s = provenance.window_duration_s,
            "using the reference's band and windows instead of the config"
        );
    }
    config.taper.low_cut_hz = provenance.low_cut_hz;
    config.taper.high_cut_hz = provenance.high_cut_hz;
    config.windows.pre_delay_s = provenance.pre_delay_s;
    config.windows.window_duration_s = provenance.window_duration_s;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> Provenance {
        Provenance {
            source: "recorded.wav".into(),
            low_cut_hz: 200.0,
            high_cut_hz: 6000.0,
            pre_delay_s: 0.01,
            window_duration_s: 0.25,
            threshold_db: None,
            peak_index: 400,
            sample_rate: 16000.0,
        }
    }

    #[test]
    fn provenance_replaces_config_band_and_windows() {
        let mut config = AnalysisConfig::default();
        adopt_provenance(&mut config, &AnalysisOverrides::default(), &provenance(), 16000.0)
            .unwrap();
        assert_eq!(config.taper.low_cut_hz, 200.0);
        assert_eq!(config.taper.high_cut_hz, 6000.0);
        assert_eq!(config.windows.pre_delay_s, 0.01);
        assert_eq!(config.windows.window_duration_s, 0.25);
    }

    #[test]
    fn matching_override_is_accepted() {
        let mut config = AnalysisConfig::default();
        let overrides = AnalysisOverrides {
            window: Some(0.25),
            ..Default::default()
        };
        assert!(adopt_provenance(&mut config, &overrides, &provenance(), 16000.0).is_ok());
    }

    #[test]
    fn conflicting_override_is_rejected() {
        let mut config = AnalysisConfig::default();
        let overrides = AnalysisOverrides {
            low_cut: Some(100.0),
            ..Default::default()
        };
        let err = adopt_provenance(&mut config, &overrides, &provenance(), 16000.0).unwrap_err();
        assert!(err.to_string().contains("--low-cut"), "{err}");
    }

    #[test]
    fn sample_rate_mismatch_is_rejected() {
        let mut config = AnalysisConfig::default();
        assert!(
            adopt_provenance(&mut config, &AnalysisOverrides::default(), &provenance(), 48000.0)
                .is_err()
        );
    }
}
